//! Get a user.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::identity::CurrentUser;
use crate::router::PathId;
use crate::user::{User, UserId};

/// `GET /users/{user_id}`.
pub async fn handler(
    State(state): State<AppState>,
    PathId(id): PathId<UserId>,
) -> Result<Json<User>> {
    state
        .store
        .find_user_by_id(id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

/// `GET /users/@me`.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
