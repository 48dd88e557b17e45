//! Request-scoped correlation context.
//!
//! # Responsibilities
//! - Generate a unique correlation ID per inbound request
//! - Keep the active request context in task-local storage for the request's lifetime
//! - Expose the trace identity of whatever span is active at call time
//!
//! # Design Decisions
//! - The context is a value: created once at request entry, never mutated
//! - Task-local scope ends with the request future, so concurrent requests never share state
//! - Trace identity is re-read on every call, never cached per request

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Unique identifier of a single inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Context attached to a request from the moment it is accepted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<RequestContextInner>,
}

#[derive(Debug)]
struct RequestContextInner {
    correlation_id: CorrelationId,
    start: Instant,
}

impl RequestContext {
    /// Correlation ID of the request.
    pub fn correlation_id(&self) -> CorrelationId {
        self.inner.correlation_id
    }

    /// Monotonic instant captured at entry.
    pub fn start(&self) -> Instant {
        self.inner.start
    }

    /// Elapsed time since entry in milliseconds. Never negative.
    pub fn elapsed_ms(&self) -> f64 {
        self.inner.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Begin a new request: allocate a correlation ID and capture the start time.
pub fn begin_request() -> RequestContext {
    RequestContext {
        inner: Arc::new(RequestContextInner {
            correlation_id: CorrelationId::new(),
            start: Instant::now(),
        }),
    }
}

tokio::task_local! {
    static ACTIVE_REQUEST: RequestContext;
}

/// Run `fut` with `ctx` available to everything it calls.
pub async fn with_request_context<Fut, T>(ctx: RequestContext, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    ACTIVE_REQUEST.scope(ctx, fut).await
}

/// The request context of the current task, if any.
pub fn current_request() -> Option<RequestContext> {
    ACTIVE_REQUEST.try_with(RequestContext::clone).ok()
}

/// The correlation ID of the current task, if any.
pub fn current_correlation_id() -> Option<CorrelationId> {
    ACTIVE_REQUEST.try_with(|ctx| ctx.correlation_id()).ok()
}

/// Identifiers of the span active at the moment of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceIdentity {
    pub trace_id: String,
    pub span_id: String,
    pub trace_flags: String,
}

/// Source of the ambient trace identity.
pub trait TraceContextSource: Send + Sync {
    fn current(&self) -> Option<TraceIdentity>;
}

/// A source that never reports an active trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceContextSource for NoTrace {
    fn current(&self) -> Option<TraceIdentity> {
        None
    }
}

/// A source that always reports the same identity.
#[derive(Debug, Clone)]
pub struct FixedTrace(pub TraceIdentity);

impl TraceContextSource for FixedTrace {
    fn current(&self) -> Option<TraceIdentity> {
        Some(self.0.clone())
    }
}
