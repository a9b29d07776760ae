//! Trigger Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trigger_rules::{SyntheticTrigger, Trigger, Urgency};

use crate::AppState;

/// Query parameters for the triggers endpoint
#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    /// Filter by urgency tier
    pub urgency: Option<Urgency>,
    /// Maximum number of records, most recent kept
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for the triggers endpoint
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub data: Vec<Trigger>,
    pub count: usize,
}

/// List active triggers, oldest first
pub async fn get_triggers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TriggerQuery>,
) -> Json<TriggerResponse> {
    let mut data: Vec<Trigger> = state
        .monitor
        .active_triggers()
        .await
        .into_iter()
        .filter(|t| params.urgency.map_or(true, |u| t.urgency == u))
        .collect();
    if data.len() > params.limit {
        data.drain(..data.len() - params.limit);
    }

    Json(TriggerResponse {
        count: data.len(),
        data,
    })
}

/// Inject a synthetic trigger
pub async fn inject_trigger(
    State(state): State<Arc<AppState>>,
    Json(synthetic): Json<SyntheticTrigger>,
) -> (StatusCode, Json<Trigger>) {
    let trigger = state.monitor.inject_trigger(synthetic).await;
    (StatusCode::CREATED, Json(trigger))
}
