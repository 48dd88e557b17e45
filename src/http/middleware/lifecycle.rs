//! Request lifecycle instrumentation.
//!
//! # Responsibilities
//! - Allocate the request context before any handler runs
//! - Open the `http.request` span, honoring an incoming `traceparent`
//! - Emit `REQUEST_RECEIVED` and exactly one of `REQUEST_COMPLETED` or `UNHANDLED_ERROR`
//! - Stamp `x-request-id` on every response
//!
//! # Design Decisions
//! - Sits outermost so timeouts and body-limit rejections still complete
//! - Panics are caught here and reported like any other unhandled fault

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use serde_json::json;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::http::request::{ClientInfo, X_REQUEST_ID};
use crate::http::response::{Fault, UnhandledFault};
use crate::observability::context::{begin_request, with_request_context, RequestContext};
use crate::observability::tracing::extract_remote_context;
use crate::observability::{metrics, EventEmitter};

pub async fn instrument_request(
    State(events): State<Arc<EventEmitter>>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = begin_request();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client = ClientInfo::from_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!(
        "http.request",
        http.method = %method,
        http.path = %path,
        request_id = %ctx.correlation_id(),
    );
    if let Some(parent) = extract_remote_context(request.headers()) {
        let _ = span.set_parent(parent);
    }

    let scope = ctx.clone();
    with_request_context(
        scope,
        async move {
            events.info(
                "REQUEST_RECEIVED",
                format!("{method} {path}"),
                json!({
                    "method": method,
                    "path": path,
                    "userAgent": client.user_agent,
                    "ip": client.ip,
                }),
            );

            let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
                Ok(response) => match response.extensions().get::<UnhandledFault>().cloned() {
                    Some(UnhandledFault(fault)) => unhandled(&events, &ctx, &method, &path, fault),
                    None => {
                        events.info(
                            "REQUEST_COMPLETED",
                            format!("{method} {path} {}", response.status().as_u16()),
                            json!({
                                "method": method,
                                "path": path,
                                "statusCode": response.status().as_u16(),
                                "durationMs": ctx.elapsed_ms(),
                            }),
                        );
                        response
                    }
                },
                Err(panic) => {
                    let fault = Fault {
                        message: panic_message(panic.as_ref()),
                        stack: Backtrace::force_capture().to_string(),
                    };
                    unhandled(&events, &ctx, &method, &path, fault)
                }
            };

            metrics::record_request(&method, response.status().as_u16(), ctx.start());
            stamp_request_id(response, &ctx)
        }
        .instrument(span),
    )
    .await
}

fn unhandled(events: &EventEmitter, ctx: &RequestContext, method: &str, path: &str, fault: Fault) -> Response {
    events.error(
        "UNHANDLED_ERROR",
        format!("Unhandled error: {}", fault.message),
        json!({
            "error": fault.message,
            "stack": fault.stack,
            "method": method,
            "path": path,
            "statusCode": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            "durationMs": ctx.elapsed_ms(),
        }),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "requestId": ctx.correlation_id(),
            "message": fault.message,
        })),
    )
        .into_response()
}

fn stamp_request_id(mut response: Response, ctx: &RequestContext) -> Response {
    if let Ok(value) = HeaderValue::from_str(&ctx.correlation_id().to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
