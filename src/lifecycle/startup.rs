//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize telemetry before anything can emit
//! - Bind the listener and report `SERVER_STARTED`
//! - Serve until a signal arrives, then report `SERVER_STOPPED`
//! - Flush sinks and the tracer provider last
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener starts last (traffic only when ready)

use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;

use crate::config::{AppConfig, ConfigError};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown, ShutdownSignal};
use crate::observability::{EventEmitter, Telemetry, TelemetryError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the service to completion with `config`.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let telemetry = Telemetry::init(&config).await?;
    let events = telemetry.emitter();

    tracing::info!(
        service = %config.service.name,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        log_sink = config.log_sink.endpoint.is_some(),
        otlp = config.tracing.otlp_endpoint.is_some(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown, events.clone()));

    let served = serve(listener, &config, events, signal).await;

    telemetry.shutdown().await;
    tracing::info!("Shutdown complete");
    served.map_err(StartupError::from)
}

/// Serve on `listener` until `shutdown` fires, bracketing the run with
/// `SERVER_STARTED` and `SERVER_STOPPED`.
pub async fn serve(
    listener: TcpListener,
    config: &AppConfig,
    events: Arc<EventEmitter>,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let local_addr = listener.local_addr()?;
    events.info(
        "SERVER_STARTED",
        format!("Server listening on {local_addr}"),
        json!({
            "address": local_addr.to_string(),
            "port": local_addr.port(),
            "service": config.service.name,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    );

    let result = HttpServer::new(config, events.clone()).run(listener, shutdown).await;

    match &result {
        Ok(()) => events.info("SERVER_STOPPED", "Server stopped", json!({})),
        Err(e) => events.error(
            "SERVER_STOPPED",
            format!("Server stopped with error: {e}"),
            json!({ "error": e.to_string() }),
        ),
    }
    result
}
