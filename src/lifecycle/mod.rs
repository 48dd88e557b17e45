//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Telemetry → Bind listener → SERVER_STARTED → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → SHUTDOWN_INITIATED → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain requests → SERVER_STOPPED → Flush sinks → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, flush telemetry
//! - Process events carry no request ID

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{run, serve, StartupError};
