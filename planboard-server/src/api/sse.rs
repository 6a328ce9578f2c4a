//! Server-Sent Events (SSE) for board changes

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE stream of board change events
///
/// Streams `ConnectionStatus` first, then one event per board change named
/// after the change (TitleSaved, PlanDeleted, RemoteChangeApplied, ...).
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    planboard_common::sse::board_event_sse(state.service.events())
}
