//! Demo HTTP service with a request-observability pipeline.
//!
//! Every request gets a correlation ID, an `http.request` span and a pair of
//! lifecycle events; handlers add domain events through the same emitter.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::{EventEmitter, Telemetry};
