//! Deliberate faults for demonstrating error reporting.
//!
//! Each kind produces a real failure value from ordinary code; the handler
//! catches it, reports `ERROR_SIMULATION_TRIGGERED` with the stack, and answers 500.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::http::handlers::invalid;
use crate::http::response::{ApiError, Fault};
use crate::http::server::AppState;
use crate::observability::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Reference,
    Type,
    Syntax,
    Custom,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Reference => "reference",
            FaultKind::Type => "type",
            FaultKind::Syntax => "syntax",
            FaultKind::Custom => "custom",
        }
    }

    /// Run the faulty operation. Only ever returns `Err` in practice.
    pub fn trigger(self) -> Result<(), Fault> {
        match self {
            FaultKind::Reference => {
                let scope: HashMap<&str, Value> = HashMap::new();
                scope
                    .get("undefined_variable")
                    .map(|_| ())
                    .ok_or_else(|| Fault::capture("undefined_variable is not defined"))
            }
            FaultKind::Type => {
                let value = Value::Null;
                value
                    .as_object()
                    .and_then(|object| object.get("some_property"))
                    .map(|_| ())
                    .ok_or_else(|| Fault::capture("cannot read property 'some_property' of null"))
            }
            FaultKind::Syntax => serde_json::from_str::<Value>("invalid json")
                .map(|_| ())
                .map_err(|e| Fault::capture(e.to_string())),
            FaultKind::Custom => Err(Fault::capture("Custom application error")),
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reference" => Ok(FaultKind::Reference),
            "type" => Ok(FaultKind::Type),
            "syntax" => Ok(FaultKind::Syntax),
            "custom" => Ok(FaultKind::Custom),
            other => Err(format!("Unknown error type: {other}")),
        }
    }
}

pub async fn simulate_error(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(kind): Path<String>,
) -> ApiError {
    let kind: FaultKind = match kind.parse() {
        Ok(kind) => kind,
        Err(message) => return invalid(&state.events, &format!("/simulate-error/{kind}"), message),
    };

    let fault = match kind.trigger() {
        Err(fault) => fault,
        Ok(()) => return ApiError::Internal(Fault::capture(format!("{kind} simulation did not fail"))),
    };

    state.events.error(
        "ERROR_SIMULATION_TRIGGERED",
        format!("Simulated {kind} error: {}", fault.message),
        json!({
            "type": kind.as_str(),
            "error": fault.message,
            "stack": fault.stack,
        }),
    );

    ApiError::Simulated {
        kind: kind.as_str().to_string(),
        message: fault.message,
        request_id: ctx.correlation_id(),
    }
}
