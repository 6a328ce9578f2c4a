//! planboard-server library - HTTP API over the title planning board

use axum::Router;
use planboard_common::BoardService;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The process's one board
    pub service: Arc<BoardService>,
}

impl AppState {
    pub fn new(service: Arc<BoardService>) -> Self {
        Self { service }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let board = Router::new()
        .route("/api/titles", get(api::list_titles).post(api::create_title))
        .route("/api/titles/bulk-delete", post(api::bulk_delete_titles))
        .route(
            "/api/titles/:id",
            get(api::get_title).put(api::update_title).delete(api::delete_title),
        )
        .route("/api/plans", get(api::list_plans))
        .route("/api/plans/:title_id", put(api::upsert_plan).delete(api::delete_plan))
        .route("/api/allocation", get(api::get_allocation).put(api::set_allocation))
        .route("/api/activity", get(api::list_activity).delete(api::clear_activity))
        .route("/api/activity/paused", put(api::set_paused))
        .route("/api/dashboard", get(api::get_dashboard))
        .route("/api/export", get(api::export_board))
        .route("/api/import", post(api::import_csv))
        .route(
            "/api/chat",
            get(api::chat_history).post(api::send_chat).delete(api::clear_chat),
        )
        .route("/api/user", get(api::get_user).put(api::set_user))
        .route("/api/sync/status", get(api::sync_status))
        .route("/api/sync/pull", post(api::sync_now))
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info));

    Router::new()
        .merge(board)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
