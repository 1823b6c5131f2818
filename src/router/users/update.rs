//! Update the caller's profile.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use super::validate_username;
use crate::AppState;
use crate::error::{Result, ServerError};
use crate::identity::CurrentUser;
use crate::router::Valid;
use crate::user::{ProfileChanges, User};

/// Only username and email can change here. Passwords have their own route.
#[derive(Debug, Validate, Deserialize)]
pub struct Body {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters long."),
        custom(
            function = "validate_username",
            message = "Username may only contain letters, digits and underscores."
        )
    )]
    username: Option<String>,
    #[validate(
        length(min = 5, max = 100, message = "Email must be 5 to 100 characters long."),
        email(message = "Email must be formated.")
    )]
    email: Option<String>,
}

/// `PATCH /users/@me`.
pub async fn handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(body): Valid<Body>,
) -> Result<Json<User>> {
    let changes = ProfileChanges {
        username: body.username,
        email: body.email,
    };
    if changes.is_empty() {
        return Ok(Json(user));
    }

    let user = state
        .store
        .update_profile(user.id, &changes)
        .await?
        .ok_or(ServerError::NotFound)?;

    Ok(Json(user))
}
