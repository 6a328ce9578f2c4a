//! Marketing plan endpoints (at most one plan per title)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use planboard_common::models::{Plan, PlanFields};

use super::error::ApiResult;
use crate::AppState;

/// GET /api/plans
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<Plan>> {
    Json(state.service.list_plans().await)
}

/// PUT /api/plans/:title_id
///
/// 201 when the title had no plan yet, 200 when an existing plan was replaced,
/// 409 when allocation enforcement rejects the campaign type.
pub async fn upsert_plan(
    State(state): State<AppState>,
    Path(title_id): Path<String>,
    Json(fields): Json<PlanFields>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    let upsert = state.service.upsert_plan(&title_id, fields).await?;
    let status = if upsert.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(upsert.plan)))
}

/// DELETE /api/plans/:title_id
pub async fn delete_plan(State(state): State<AppState>, Path(title_id): Path<String>) -> ApiResult<Json<Plan>> {
    Ok(Json(state.service.delete_plan(&title_id).await?))
}
