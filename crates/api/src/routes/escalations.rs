//! Escalation Routes

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use escalation::{EscalationRequest, EscalationStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Query parameters for the escalations endpoint
#[derive(Debug, Deserialize)]
pub struct EscalationQuery {
    /// Filter by lifecycle state
    pub status: Option<EscalationStatus>,
}

/// Response for the escalations endpoint
#[derive(Debug, Serialize)]
pub struct EscalationResponse {
    pub data: Vec<EscalationRequest>,
    pub count: usize,
    pub pending_count: usize,
    pub overdue_count: usize,
}

/// Response for a resolve request
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub id: String,
    pub status: EscalationStatus,
}

/// List escalation requests, oldest first
pub async fn get_escalations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EscalationQuery>,
) -> Json<EscalationResponse> {
    let all = state.monitor.escalations().await;
    let count_of = |s: EscalationStatus| all.iter().filter(|r| r.status == s).count();
    let pending_count = count_of(EscalationStatus::Pending);
    let overdue_count = count_of(EscalationStatus::Overdue);

    let data: Vec<EscalationRequest> = all
        .into_iter()
        .filter(|r| params.status.map_or(true, |s| r.status == s))
        .collect();

    Json(EscalationResponse {
        count: data.len(),
        data,
        pending_count,
        overdue_count,
    })
}

/// Markdown document of one escalation
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.monitor.escalation_document(&id).await?;
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], document))
}

/// Resolve a pending or overdue escalation
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResolveResponse>, ApiError> {
    if !state.monitor.resolve_escalation(&id).await {
        return Err(ApiError::NotFound(format!("no open escalation {}", id)));
    }
    Ok(Json(ResolveResponse {
        id,
        status: EscalationStatus::Resolved,
    }))
}
