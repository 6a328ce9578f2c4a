//! Activity feed endpoints

use axum::{extract::State, Json};
use planboard_common::models::Activity;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub activities: Vec<Activity>,
    pub paused: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PausedBody {
    pub paused: bool,
}

/// GET /api/activity
pub async fn list_activity(State(state): State<AppState>) -> Json<ActivityResponse> {
    let board = state.service.board().await;
    Json(ActivityResponse {
        activities: board.activities().to_vec(),
        paused: board.activity_paused(),
    })
}

/// DELETE /api/activity
pub async fn clear_activity(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.service.clear_activities().await;
    Json(ClearResponse { cleared })
}

/// PUT /api/activity/paused
pub async fn set_paused(State(state): State<AppState>, Json(body): Json<PausedBody>) -> Json<PausedBody> {
    state.service.set_activity_paused(body.paused).await;
    Json(body)
}
