//! Request-side helpers.
//!
//! # Responsibilities
//! - Expose the request context to handlers as an extractor
//! - Collect client metadata for the lifecycle events
//!
//! # Design Decisions
//! - The correlation ID is always generated server-side; an incoming
//!   `x-request-id` is never trusted as a correlation ID
//! - Extracting a context outside the lifecycle middleware is a fault, not a fresh ID

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::{header, request::Parts, HeaderName};

use crate::http::response::{ApiError, Fault};
use crate::observability::context::{current_request, RequestContext};

/// Response header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .or_else(current_request)
            .ok_or_else(|| {
                ApiError::Internal(Fault::capture(
                    "no request context: lifecycle middleware is not installed",
                ))
            })
    }
}

/// Client metadata recorded on `REQUEST_RECEIVED`.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl ClientInfo {
    pub fn from_request(request: &Request) -> Self {
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Prefer the proxy-reported client, fall back to the socket peer.
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            user_agent,
            ip: forwarded.or(peer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::http::response::UnhandledFault;
    use crate::observability::context::{begin_request, with_request_context};

    #[test]
    fn client_info_prefers_forwarded_for() {
        let mut request = Request::builder()
            .uri("/health")
            .header(header::USER_AGENT, "curl/8.0")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("127.0.0.1:5000".parse::<SocketAddr>().unwrap()));

        let info = ClientInfo::from_request(&request);
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(info.ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn client_info_falls_back_to_peer() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.0.2.1:5000".parse::<SocketAddr>().unwrap()));

        let info = ClientInfo::from_request(&request);
        assert!(info.user_agent.is_none());
        assert_eq!(info.ip.as_deref(), Some("192.0.2.1"));
    }

    #[tokio::test]
    async fn extractor_returns_the_attached_context() {
        let ctx = begin_request();
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(ctx.clone());
        let (mut parts, _) = request.into_parts();

        let extracted = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.correlation_id(), ctx.correlation_id());
    }

    #[tokio::test]
    async fn extractor_falls_back_to_the_task_local_context() {
        let ctx = begin_request();
        let (mut parts, _) = Request::builder().uri("/").body(Body::empty()).unwrap().into_parts();

        let extract = RequestContext::from_request_parts(&mut parts, &());
        let extracted = with_request_context(ctx.clone(), extract).await.unwrap();
        assert_eq!(extracted.correlation_id(), ctx.correlation_id());
    }

    #[tokio::test]
    async fn extractor_rejects_without_a_context() {
        let (mut parts, _) = Request::builder().uri("/").body(Body::empty()).unwrap().into_parts();

        let rejection = RequestContext::from_request_parts(&mut parts, &()).await.unwrap_err();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<UnhandledFault>().is_some());
    }
}
