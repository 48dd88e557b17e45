//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (lifecycle instrumentation, timeout, body limit)
//! - Serve on a bound listener until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;
use crate::http::handlers::{self, health, performance, posts, simulate, users};
use crate::http::middleware::instrument_request;
use crate::lifecycle::ShutdownSignal;
use crate::observability::EventEmitter;
use crate::store::Store;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub events: Arc<EventEmitter>,
    pub started: Instant,
    pub service_name: Arc<str>,
}

impl AppState {
    pub fn new(config: &AppConfig, events: Arc<EventEmitter>) -> Self {
        Self {
            store: Store::new(),
            events,
            started: Instant::now(),
            service_name: Arc::from(config.service.name.as_str()),
        }
    }
}

/// HTTP server for the demo API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with a fresh store.
    pub fn new(config: &AppConfig, events: Arc<EventEmitter>) -> Self {
        Self::with_state(config, AppState::new(config, events))
    }

    pub fn with_state(config: &AppConfig, state: AppState) -> Self {
        let events = state.events.clone();
        let router = instrument(routes().with_state(state), config, events);
        Self { router }
    }

    /// The fully layered router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every route of the API, before middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/performance-test/{scenario}", get(performance::performance_test))
        .route("/simulate-error/{kind}", get(simulate::simulate_error))
        .route("/health", get(health::health))
        .fallback(handlers::not_found)
}

/// Wrap `router` in the request pipeline, outermost layer first.
#[allow(deprecated)]
pub fn instrument(router: Router, config: &AppConfig, events: Arc<EventEmitter>) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(events, instrument_request))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
    )
}
