//! HTTP middleware.

pub mod lifecycle;

pub use lifecycle::instrument_request;
