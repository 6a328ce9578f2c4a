//! Campaign allocation endpoints

use axum::{extract::State, Json};
use planboard_common::models::{Allocation, AllocationUsage};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub allocation: Allocation,
    pub usage: AllocationUsage,
}

/// GET /api/allocation
pub async fn get_allocation(State(state): State<AppState>) -> Json<AllocationResponse> {
    let (allocation, usage) = state.service.allocation().await;
    Json(AllocationResponse { allocation, usage })
}

/// PUT /api/allocation
///
/// Zero totals fall back to the defaults (12 Marquee, 6 Blockbuster).
pub async fn set_allocation(
    State(state): State<AppState>,
    Json(allocation): Json<Allocation>,
) -> Json<AllocationResponse> {
    let (allocation, usage) = state.service.set_allocation(allocation).await;
    Json(AllocationResponse { allocation, usage })
}
