//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the OpenTelemetry tracer provider (OTLP export when configured)
//! - Extract W3C trace context from incoming requests
//! - Report the identity of the span active at call time
//!
//! # Design Decisions
//! - Spans are always created in-process so log records can carry trace IDs,
//!   even when no exporter endpoint is configured
//! - Supports W3C Trace Context headers

use axum::http::HeaderMap;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{global, Context};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::context::{TraceContextSource, TraceIdentity};
use crate::observability::TelemetryError;

/// Build the tracer provider and install it with the W3C propagator.
///
/// Must not be called from an async context when `otlp_endpoint` is set; the
/// exporter uses a blocking HTTP client.
pub fn init_tracer_provider(
    service_name: &str,
    otlp_endpoint: Option<&str>,
) -> Result<SdkTracerProvider, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let builder = SdkTracerProvider::builder().with_resource(resource);
    let provider = match otlp_endpoint {
        Some(endpoint) => {
            let endpoint = if endpoint.ends_with("/v1/traces") {
                endpoint.to_string()
            } else {
                format!("{}/v1/traces", endpoint.trim_end_matches('/'))
            };
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| TelemetryError::Exporter(e.to_string()))?;
            builder.with_batch_exporter(exporter).build()
        }
        None => builder.build(),
    };

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Reads the OpenTelemetry context of the current `tracing` span.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtelTraceSource;

impl TraceContextSource for OtelTraceSource {
    fn current(&self) -> Option<TraceIdentity> {
        let cx = tracing::Span::current().context();
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return None;
        }
        Some(TraceIdentity {
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
            trace_flags: format!("{:02x}", span_context.trace_flags().to_u8()),
        })
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Remote parent context from `traceparent`/`tracestate`, if the request carries a valid one.
pub fn extract_remote_context(headers: &HeaderMap) -> Option<Context> {
    if !headers.contains_key("traceparent") {
        return None;
    }
    let cx = global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)));
    if cx.span().span_context().is_valid() {
        Some(cx)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::layer::SubscriberExt;

    fn provider() -> SdkTracerProvider {
        SdkTracerProvider::builder().build()
    }

    #[test]
    fn no_identity_outside_a_span() {
        let provider = provider();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));

        tracing::subscriber::with_default(subscriber, || {
            assert!(OtelTraceSource.current().is_none());
        });
    }

    #[test]
    fn identity_reflects_the_entered_span() {
        let provider = provider();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("outer");
            let _entered = outer.enter();
            let parent = OtelTraceSource.current().expect("identity inside span");
            assert_eq!(parent.trace_id.len(), 32);
            assert_eq!(parent.span_id.len(), 16);
            assert_eq!(parent.trace_flags, "01");

            let child = tracing::info_span!("child");
            let child_identity = child.in_scope(|| OtelTraceSource.current()).expect("child identity");
            assert_eq!(child_identity.trace_id, parent.trace_id);
            assert_ne!(child_identity.span_id, parent.span_id);
        });
    }

    #[test]
    fn no_identity_without_otel_layer() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("plain");
            let _entered = span.enter();
            assert!(OtelTraceSource.current().is_none());
        });
    }

    #[test]
    fn remote_context_requires_a_valid_traceparent() {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let mut headers = HeaderMap::new();
        assert!(extract_remote_context(&headers).is_none());

        headers.insert("traceparent", "garbage".parse().unwrap());
        assert!(extract_remote_context(&headers).is_none());

        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".parse().unwrap(),
        );
        let cx = extract_remote_context(&headers).expect("valid parent");
        assert_eq!(
            cx.span().span_context().trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }
}
