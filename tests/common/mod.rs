//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use tracelog_demo::config::AppConfig;
use tracelog_demo::http::server::{instrument, AppState};
use tracelog_demo::http::HttpServer;
use tracelog_demo::observability::event::EventRecord;
use tracelog_demo::observability::sinks::SharedBuffer;
use tracelog_demo::observability::{ConsoleSink, EventEmitter, MemorySink, Sink, SinkError};

/// A router wired to in-memory sinks.
pub struct TestApp {
    pub router: Router,
    pub emitter: Arc<EventEmitter>,
    pub records: Arc<MemorySink>,
    pub console: SharedBuffer,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// Build an app whose emitter also feeds `extra` sinks, ahead of the memory sink.
    pub fn with_sinks(extra: Vec<Arc<dyn Sink>>) -> Self {
        let config = AppConfig::default();
        let records = Arc::new(MemorySink::new());
        let console = SharedBuffer::default();

        let mut builder = EventEmitter::builder();
        for sink in extra {
            builder = builder.sink(sink);
        }
        let emitter = Arc::new(
            builder
                .sink(records.clone())
                .sink(Arc::new(ConsoleSink::with_writer(console.clone())))
                .build(),
        );

        let router = HttpServer::new(&config, emitter.clone()).router();
        Self {
            router,
            emitter,
            records,
            console,
            config,
        }
    }

    /// Same sinks, different routes.
    pub fn with_routes(self, routes: Router<AppState>) -> Self {
        let state = AppState::new(&self.config, self.emitter.clone());
        let router = instrument(routes.with_state(state), &self.config, self.emitter.clone());
        Self { router, ..self }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(self.router.clone(), request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(get(uri)).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(json_request(Method::POST, uri, &body)).await
    }

    pub fn of_type(&self, event_type: &str) -> Vec<EventRecord> {
        self.records.of_type(event_type)
    }

    /// Records emitted while serving the request with `request_id`.
    pub fn for_request(&self, request_id: &str) -> Vec<EventRecord> {
        self.records
            .records()
            .into_iter()
            .filter(|r| r.correlation_id().map(|id| id.to_string()).as_deref() == Some(request_id))
            .collect()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn request_id(&self) -> String {
        self.headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("x-request-id header")
            .to_string()
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    TestResponse { status, headers, body }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A durable sink whose collector is always down.
pub struct FailingSink;

impl Sink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn accept(&self, _record: &EventRecord) -> Result<(), SinkError> {
        Err(SinkError::Rejected("collector unavailable".into()))
    }
}

/// What a log collector received: one entry per POSTed batch.
#[derive(Clone, Default)]
pub struct Collected {
    pub batches: Arc<Mutex<Vec<Vec<Value>>>>,
    pub authorization: Arc<Mutex<Vec<String>>>,
}

impl Collected {
    pub fn records(&self) -> Vec<Value> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

/// Start a log ingestion endpoint on an ephemeral port.
pub async fn start_log_collector() -> (SocketAddr, Collected) {
    async fn ingest(State(collected): State<Collected>, headers: HeaderMap, Json(batch): Json<Vec<Value>>) -> StatusCode {
        if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            collected.authorization.lock().unwrap().push(auth.to_string());
        }
        collected.batches.lock().unwrap().push(batch);
        StatusCode::ACCEPTED
    }

    let collected = Collected::default();
    let app = Router::new().route("/ingest", post(ingest)).with_state(collected.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, collected)
}
