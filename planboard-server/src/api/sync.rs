//! Sync status endpoints

use axum::{extract::State, Json};
use planboard_common::sync::SyncStatus;

use super::error::ApiResult;
use crate::AppState;

/// GET /api/sync/status
pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.service.sync_status())
}

/// POST /api/sync/pull
///
/// Runs one push-then-pull cycle now; 400 when sync is not enabled.
pub async fn sync_now(State(state): State<AppState>) -> ApiResult<Json<SyncStatus>> {
    Ok(Json(state.service.sync_now().await?))
}
