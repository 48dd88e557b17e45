//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map handler errors to HTTP status codes and JSON bodies
//! - Mark unhandled faults so the lifecycle boundary can report them
//!
//! # Design Decisions
//! - Faults are values, never unwinding; the boundary still catches panics
//! - 400 bodies are `{errors: [...]}`, 404 and 413 bodies are `{error}`

use std::backtrace::Backtrace;
use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::observability::CorrelationId;

/// A captured fault: message plus the stack at the point of capture.
#[derive(Debug, Clone)]
pub struct Fault {
    pub message: String,
    pub stack: String,
}

impl Fault {
    pub fn capture(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Backtrace::force_capture().to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Response extension marking a fault nobody handled.
#[derive(Debug, Clone)]
pub struct UnhandledFault(pub Fault);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("simulated {kind} error: {message}")]
    Simulated {
        kind: String,
        message: String,
        request_id: CorrelationId,
    },

    #[error("unhandled fault: {0}")]
    Internal(Fault),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Simulated { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::validation(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(json!({ "errors": errors }))).into_response(),
            ApiError::NotFound(error) | ApiError::PayloadTooLarge(error) => {
                (status, Json(json!({ "error": error }))).into_response()
            }
            ApiError::Simulated {
                kind,
                message,
                request_id,
            } => (
                status,
                Json(json!({
                    "error": "Simulated error",
                    "type": kind,
                    "message": message,
                    "requestId": request_id,
                })),
            )
                .into_response(),
            ApiError::Internal(fault) => {
                let mut response = (status, Json(json!({ "error": "Internal server error" }))).into_response();
                response.extensions_mut().insert(UnhandledFault(fault));
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("User not found".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::PayloadTooLarge("length limit exceeded".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Internal(Fault::capture("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_are_marked_for_the_boundary() {
        let response = ApiError::Internal(Fault::capture("boom")).into_response();
        let marker = response.extensions().get::<UnhandledFault>().expect("marker");
        assert_eq!(marker.0.message, "boom");
        assert!(!marker.0.stack.is_empty());
    }

    #[test]
    fn handled_errors_are_not_marked() {
        let response = ApiError::NotFound("User not found".into()).into_response();
        assert!(response.extensions().get::<UnhandledFault>().is_none());
    }
}
