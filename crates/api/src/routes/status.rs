//! Status and control routes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use monitor::SystemStatus;
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for start/stop requests
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub monitoring_active: bool,
    /// Whether the request changed anything
    pub changed: bool,
}

/// Current engine status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.monitor.status().await)
}

/// Run a cycle immediately
pub async fn force_evaluation(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.monitor.force_evaluation().await)
}

/// Start the periodic loop
pub async fn start_monitoring(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let changed = state.scheduler.start().await;
    Json(ControlResponse {
        monitoring_active: state.scheduler.is_running(),
        changed,
    })
}

/// Stop the periodic loop after its current cycle
pub async fn stop_monitoring(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let changed = state.scheduler.is_running();
    state.scheduler.stop().await;
    Json(ControlResponse {
        monitoring_active: state.scheduler.is_running(),
        changed,
    })
}

/// Prometheus text exposition
pub async fn render_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
