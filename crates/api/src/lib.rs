//! Trigger Engine API Server
//!
//! HTTP control and status surface over a running [`Monitor`].

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use monitor::{Monitor, MonitoringLoop};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    /// Engine handle
    pub monitor: Arc<Monitor>,
    /// Periodic loop driving the engine
    pub scheduler: Arc<MonitoringLoop>,
    /// Prometheus render handle, if a recorder is installed
    pub prometheus: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(scheduler: Arc<MonitoringLoop>, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            monitor: Arc::clone(scheduler.monitor()),
            scheduler,
            prometheus,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/evaluate", post(routes::status::force_evaluation))
        .route("/api/v1/monitoring/start", post(routes::status::start_monitoring))
        .route("/api/v1/monitoring/stop", post(routes::status::stop_monitoring))
        .route("/api/v1/triggers", get(routes::triggers::get_triggers))
        .route("/api/v1/triggers/synthetic", post(routes::triggers::inject_trigger))
        .route("/api/v1/escalations", get(routes::escalations::get_escalations))
        .route(
            "/api/v1/escalations/:id/document",
            get(routes::escalations::get_document),
        )
        .route(
            "/api/v1/escalations/:id/resolve",
            post(routes::escalations::resolve),
        )
        .route("/metrics", get(routes::status::render_metrics))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Initialize logging.
///
/// Honors `RUST_LOG`, defaulting to `info`. Fails if a subscriber is already set.
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
    }
}

/// Install the global Prometheus recorder for the `metrics` facade
pub fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Serve the router until `shutdown` resolves
pub async fn run_server<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
