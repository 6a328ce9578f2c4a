//! Dashboard summary endpoint

use axum::{extract::State, Json};
use planboard_common::board::Dashboard;

use crate::AppState;

/// GET /api/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    Json(state.service.dashboard().await)
}
