//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware/lifecycle.rs (request context, span, lifecycle events)
//!     → handlers/ (validate, touch the store, emit domain events)
//!     → response.rs (ApiError → status + JSON body)
//!     → middleware/lifecycle.rs (completion or unhandled fault, x-request-id)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, Fault};
pub use server::{AppState, HttpServer};
