//! Export and spreadsheet import endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use planboard_common::export::EXPORT_FILE_NAME;
use planboard_common::import::ImportReport;
use serde::Deserialize;

use super::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// Name recorded in the activity feed, usually the uploaded file name
    #[serde(default)]
    pub source: String,
}

/// GET /api/export
///
/// Titles, plans and activity as a JSON download.
pub async fn export_board(State(state): State<AppState>) -> impl IntoResponse {
    let document = state.service.export().await;
    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    ([(header::CONTENT_DISPOSITION, disposition)], Json(document))
}

/// POST /api/import?source=<name>
///
/// Body is CSV text with a header row.
pub async fn import_csv(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> ApiResult<Json<ImportReport>> {
    Ok(Json(state.service.import_csv(&body, &query.source).await?))
}
