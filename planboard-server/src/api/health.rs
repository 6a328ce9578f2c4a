//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub titles: usize,
    pub sync_enabled: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let titles = state.service.board().await.titles().len();
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "planboard-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        titles,
        sync_enabled: state.service.sync_agent().is_some(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
