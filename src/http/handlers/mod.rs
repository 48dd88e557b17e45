//! Route handlers.
//!
//! Handlers return `Result<_, ApiError>` and report domain events through the
//! shared emitter in [`AppState`](crate::http::server::AppState).

pub mod health;
pub mod performance;
pub mod posts;
pub mod simulate;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::EventEmitter;

/// Report a body that could not be decoded. Malformed bodies become a 400,
/// oversized ones keep their 413.
fn rejected(events: &EventEmitter, path: &str, rejection: JsonRejection) -> ApiError {
    let error = ApiError::from(rejection);
    if let ApiError::Validation(errors) = &error {
        events.warn(
            "VALIDATION_ERROR",
            "Request body could not be parsed",
            json!({ "errors": errors, "path": path }),
        );
    }
    error
}

/// Report a path parameter outside the accepted set and turn it into a 400.
fn invalid(events: &EventEmitter, path: &str, message: String) -> ApiError {
    events.warn(
        "VALIDATION_ERROR",
        message.clone(),
        json!({ "errors": [&message], "path": path }),
    );
    ApiError::validation(message)
}

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": state.service_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /users",
            "GET /users",
            "GET /users/{id}",
            "POST /posts",
            "GET /posts?userId=",
            "GET /performance-test/{scenario}",
            "GET /simulate-error/{type}",
            "GET /health",
        ],
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
