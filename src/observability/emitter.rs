//! Structured event emission.
//!
//! # Responsibilities
//! - Stamp each record with time, correlation ID and the active trace identity
//! - Fan the record out to every sink
//! - Keep sink failures away from callers
//!
//! # Design Decisions
//! - Built once at startup and shared via `Arc`; no global logger
//! - Trace identity is read at emission time, so two events of one request may
//!   carry different span IDs
//! - A failing or panicking sink never prevents delivery to the others

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::observability::context::{current_correlation_id, NoTrace, TraceContextSource};
use crate::observability::event::{into_attributes, EventRecord, Level};
use crate::observability::metrics;
use crate::observability::sinks::Sink;

struct SinkSlot {
    sink: Arc<dyn Sink>,
    failed: AtomicBool,
}

/// Emits structured events to a fixed set of sinks.
pub struct EventEmitter {
    sinks: Vec<SinkSlot>,
    trace_source: Arc<dyn TraceContextSource>,
    min_level: Level,
}

/// Builder for [`EventEmitter`].
pub struct EventEmitterBuilder {
    sinks: Vec<Arc<dyn Sink>>,
    trace_source: Arc<dyn TraceContextSource>,
    min_level: Level,
}

impl EventEmitterBuilder {
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn trace_source(mut self, source: Arc<dyn TraceContextSource>) -> Self {
        self.trace_source = source;
        self
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn build(self) -> EventEmitter {
        EventEmitter {
            sinks: self
                .sinks
                .into_iter()
                .map(|sink| SinkSlot {
                    sink,
                    failed: AtomicBool::new(false),
                })
                .collect(),
            trace_source: self.trace_source,
            min_level: self.min_level,
        }
    }
}

impl EventEmitter {
    pub fn builder() -> EventEmitterBuilder {
        EventEmitterBuilder {
            sinks: Vec::new(),
            trace_source: Arc::new(NoTrace),
            min_level: Level::Debug,
        }
    }

    /// Emit an event. Never fails.
    ///
    /// `attributes` should be a JSON object; see [`into_attributes`] for other values.
    pub fn emit(&self, level: Level, event_type: &str, message: impl Into<String>, attributes: Value) {
        if level < self.min_level {
            return;
        }
        metrics::record_event(event_type);

        let record = EventRecord::new(
            level,
            event_type.to_string(),
            message.into(),
            into_attributes(attributes),
            current_correlation_id(),
            self.trace_source.current(),
        );

        for slot in &self.sinks {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.sink.accept(&record)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => "sink panicked".to_string(),
            };
            if !slot.failed.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    sink = slot.sink.name(),
                    error = %error,
                    event = event_type,
                    "Event sink failed; further failures logged at debug"
                );
            } else {
                tracing::debug!(sink = slot.sink.name(), error = %error, event = event_type, "Event sink failed");
            }
        }
    }

    pub fn debug(&self, event_type: &str, message: impl Into<String>, attributes: Value) {
        self.emit(Level::Debug, event_type, message, attributes);
    }

    pub fn info(&self, event_type: &str, message: impl Into<String>, attributes: Value) {
        self.emit(Level::Info, event_type, message, attributes);
    }

    pub fn warn(&self, event_type: &str, message: impl Into<String>, attributes: Value) {
        self.emit(Level::Warn, event_type, message, attributes);
    }

    pub fn error(&self, event_type: &str, message: impl Into<String>, attributes: Value) {
        self.emit(Level::Error, event_type, message, attributes);
    }

    /// Flush and close every sink.
    pub async fn close(&self) {
        for slot in &self.sinks {
            slot.sink.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::context::{begin_request, with_request_context, FixedTrace, TraceIdentity};
    use crate::observability::sinks::{ConsoleSink, MemorySink, SharedBuffer, SinkError};
    use serde_json::json;

    struct FailingSink;

    impl Sink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn accept(&self, _record: &EventRecord) -> Result<(), SinkError> {
            Err(SinkError::Rejected("transport unreachable".into()))
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn accept(&self, _record: &EventRecord) -> Result<(), SinkError> {
            panic!("boom")
        }
    }

    fn identity() -> TraceIdentity {
        TraceIdentity {
            trace_id: "0af7651916cd43dd8448eb211c80319c".into(),
            span_id: "b7ad6b7169203331".into(),
            trace_flags: "01".into(),
        }
    }

    #[test]
    fn failing_sinks_do_not_stop_other_sinks() {
        let memory = Arc::new(MemorySink::new());
        let buffer = SharedBuffer::default();
        let emitter = EventEmitter::builder()
            .sink(Arc::new(FailingSink))
            .sink(Arc::new(PanickingSink))
            .sink(Arc::new(ConsoleSink::with_writer(buffer.clone())))
            .sink(memory.clone())
            .build();

        emitter.info("USER_CREATED", "User created", json!({"userId": "u1"}));
        emitter.info("USER_CREATED", "User created", json!({"userId": "u2"}));

        assert_eq!(memory.of_type("USER_CREATED").len(), 2);
        assert_eq!(buffer.contents().matches("USER_CREATED").count(), 2);
    }

    #[test]
    fn trace_fields_follow_the_source() {
        let memory = Arc::new(MemorySink::new());
        let traced = EventEmitter::builder()
            .sink(memory.clone())
            .trace_source(Arc::new(FixedTrace(identity())))
            .build();
        traced.info("A", "a", Value::Null);

        let untraced = EventEmitter::builder().sink(memory.clone()).build();
        untraced.info("B", "b", Value::Null);

        let a = memory.of_type("A")[0].to_json();
        let b = memory.of_type("B")[0].to_json();
        assert_eq!(a["trace_id"], "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(a["span_id"], "b7ad6b7169203331");
        assert!(b.get("trace_id").is_none());
        assert!(b.get("span_id").is_none());
        assert!(b.get("trace_flags").is_none());
    }

    #[test]
    fn records_below_min_level_are_dropped() {
        let memory = Arc::new(MemorySink::new());
        let emitter = EventEmitter::builder()
            .sink(memory.clone())
            .min_level(Level::Info)
            .build();

        emitter.debug("HEALTH_CHECK", "Health check", Value::Null);
        emitter.warn("VALIDATION_ERROR", "Validation failed", Value::Null);

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level(), Level::Warn);
    }

    #[tokio::test]
    async fn correlation_id_comes_from_the_active_request() {
        let memory = Arc::new(MemorySink::new());
        let emitter = Arc::new(EventEmitter::builder().sink(memory.clone()).build());

        emitter.info("SERVER_STARTED", "Server started", Value::Null);

        let ctx = begin_request();
        let id = ctx.correlation_id();
        let inner = emitter.clone();
        with_request_context(ctx, async move {
            inner.info("USER_CREATED", "User created", Value::Null);
        })
        .await;

        assert!(memory.of_type("SERVER_STARTED")[0].correlation_id().is_none());
        assert_eq!(memory.of_type("USER_CREATED")[0].correlation_id(), Some(id));
    }
}
