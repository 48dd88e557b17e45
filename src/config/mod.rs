//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (serde)
//!     → loader.rs (optional TOML file, then environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to telemetry and the HTTP server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, LimitsConfig, ListenerConfig, LogFormat, LogSinkConfig, ObservabilityConfig, ServiceConfig,
    TimeoutConfig, TracingConfig,
};
pub use validation::ValidationError;
