//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request enters
//!     → context.rs (correlation ID, task-local request scope)
//!     → emitter.rs (enrich with timestamp, request ID, trace identity)
//!     → sinks.rs (console line + durable HTTP transport)
//!
//! Alongside:
//!     → logging.rs (diagnostic tracing subscriber)
//!     → tracing.rs (OpenTelemetry spans, W3C propagation)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - One emitter per process, built at startup and injected; closed on shutdown
//! - Request ID flows through every record emitted during a request
//! - Trace identity is read when a record is emitted

pub mod context;
pub mod emitter;
pub mod event;
pub mod logging;
pub mod metrics;
pub mod sinks;
pub mod tracing;

use std::sync::Arc;
use std::time::Duration;

use opentelemetry_sdk::trace::SdkTracerProvider;
use url::Url;

use crate::config::AppConfig;

pub use context::{begin_request, current_correlation_id, CorrelationId, RequestContext, TraceIdentity};
pub use emitter::EventEmitter;
pub use event::{EventRecord, Level};
pub use sinks::{ConsoleSink, HttpLogSink, MemorySink, Sink, SinkError};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
    #[error("failed to build span exporter: {0}")]
    Exporter(String),
    #[error("failed to start log sink: {0}")]
    Sink(#[from] SinkError),
    #[error("invalid log sink endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Process-wide telemetry handles.
///
/// Initialize before serving the first request; call [`Telemetry::shutdown`] last.
pub struct Telemetry {
    emitter: Arc<EventEmitter>,
    provider: SdkTracerProvider,
}

impl Telemetry {
    pub async fn init(config: &AppConfig) -> Result<Self, TelemetryError> {
        let service_name = config.service.name.clone();
        let otlp_endpoint = config.tracing.otlp_endpoint.clone();
        let provider = tokio::task::spawn_blocking(move || {
            tracing::init_tracer_provider(&service_name, otlp_endpoint.as_deref())
        })
        .await
        .map_err(|e| TelemetryError::Exporter(e.to_string()))??;

        logging::init_logging(&config.observability, &provider, &config.service.name)?;

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => ::tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let emitter = Arc::new(build_emitter(config)?);
        Ok(Self { emitter, provider })
    }

    pub fn emitter(&self) -> Arc<EventEmitter> {
        self.emitter.clone()
    }

    /// Flush sinks and shut down the tracer provider.
    pub async fn shutdown(self) {
        self.emitter.close().await;

        let provider = self.provider;
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ::tracing::warn!(error = ?e, "Tracer provider shutdown failed"),
            Err(e) => ::tracing::warn!(error = %e, "Tracer provider shutdown task failed"),
        }
    }
}

/// Build the emitter described by `config`: console sink always, HTTP sink when configured.
pub fn build_emitter(config: &AppConfig) -> Result<EventEmitter, TelemetryError> {
    let mut builder = EventEmitter::builder()
        .sink(Arc::new(ConsoleSink::stdout()))
        .trace_source(Arc::new(tracing::OtelTraceSource))
        .min_level(config.observability.event_level);

    if let Some(endpoint) = &config.log_sink.endpoint {
        let sink = HttpLogSink::spawn(
            Url::parse(endpoint)?,
            config.log_sink.token.clone().unwrap_or_default(),
            config.log_sink.batch_size,
            Duration::from_secs(config.log_sink.timeout_secs),
        )?;
        builder = builder.sink(Arc::new(sink));
    } else {
        ::tracing::info!("No log sink endpoint configured; events go to the console only");
    }

    Ok(builder.build())
}
