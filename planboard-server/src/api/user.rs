//! Display name used to attribute changes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserBody {
    pub user: String,
}

/// GET /api/user
pub async fn get_user(State(state): State<AppState>) -> Json<UserBody> {
    Json(UserBody {
        user: state.service.current_user().await,
    })
}

/// PUT /api/user
pub async fn set_user(State(state): State<AppState>, Json(body): Json<UserBody>) -> ApiResult<Json<UserBody>> {
    let user = state.service.set_user(&body.user).await?;
    Ok(Json(UserBody { user }))
}
