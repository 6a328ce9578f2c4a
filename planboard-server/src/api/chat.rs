//! Planning assistant chat endpoints

use axum::{extract::State, http::StatusCode, Json};
use planboard_common::models::ChatMessage;
use serde::Deserialize;

use super::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// GET /api/chat
pub async fn chat_history(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.service.chat_history().await)
}

/// POST /api/chat
///
/// Returns the stored question and the assistant's reply.
pub async fn send_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.service.send_chat(&request.message).await?))
}

/// DELETE /api/chat
pub async fn clear_chat(State(state): State<AppState>) -> StatusCode {
    state.service.clear_chat().await;
    StatusCode::NO_CONTENT
}
