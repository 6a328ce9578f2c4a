//! Title endpoints
//!
//! Listing is ranked by score (highest first) and narrowed by query filters:
//! `title`, `author`, `month` (YYYY-MM), `genre`, `priority`, `tier`, `region`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use planboard_common::models::{Title, TitleFields};
use planboard_common::TitleFilter;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: Vec<String>,
}

/// GET /api/titles
pub async fn list_titles(
    State(state): State<AppState>,
    Query(filter): Query<TitleFilter>,
) -> Json<Vec<Title>> {
    Json(state.service.list_titles(&filter).await)
}

/// GET /api/titles/:id
pub async fn get_title(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Title>> {
    Ok(Json(state.service.get_title(&id).await?))
}

/// POST /api/titles
pub async fn create_title(
    State(state): State<AppState>,
    Json(fields): Json<TitleFields>,
) -> ApiResult<(StatusCode, Json<Title>)> {
    let title = state.service.create_title(fields).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// PUT /api/titles/:id
pub async fn update_title(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<TitleFields>,
) -> ApiResult<Json<Title>> {
    Ok(Json(state.service.update_title(&id, fields).await?))
}

/// DELETE /api/titles/:id
///
/// Also removes the title's plan.
pub async fn delete_title(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Title>> {
    Ok(Json(state.service.delete_title(&id).await?))
}

/// POST /api/titles/bulk-delete
///
/// 400 for an empty id list, 404 when none of the ids exist.
pub async fn bulk_delete_titles(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    let deleted = state.service.bulk_delete_titles(&request.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}
