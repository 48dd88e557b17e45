//! Diagnostic logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber
//! - Bridge spans into OpenTelemetry
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - Diagnostics go to stderr; stdout belongs to the console event sink
//! - `RUST_LOG` overrides the configured level

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::TelemetryError;

/// Install the global subscriber with the OpenTelemetry layer attached.
pub fn init_logging(
    config: &ObservabilityConfig,
    provider: &SdkTracerProvider,
    service_name: &str,
) -> Result<(), TelemetryError> {
    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter(&config.log_level))
            .with(otel_layer)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| TelemetryError::Subscriber(e.to_string())),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter(&config.log_level))
            .with(otel_layer)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| TelemetryError::Subscriber(e.to_string())),
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
