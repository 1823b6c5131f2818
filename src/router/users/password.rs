//! Password change.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use validator::Validate;

use super::validate_password;
use crate::AppState;
use crate::crypto::Password;
use crate::error::{AuthFailure, Result, ServerError};
use crate::identity::CurrentUser;
use crate::router::Valid;
use crate::token::Scope;

#[derive(Validate, Deserialize)]
pub struct Body {
    #[validate(length(min = 1, max = 100))]
    current_password: String,
    #[validate(
        length(min = 8, max = 100, message = "Password must be 8 to 100 characters long."),
        custom(
            function = "validate_password",
            message = "Password must contain at least one digit."
        )
    )]
    new_password: String,
}

/// `PUT /users/@me/password`.
///
/// Every authentication token of the user, including the one used for this
/// request, is revoked in the same transaction as the hash change.
pub async fn handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(body): Valid<Body>,
) -> Result<StatusCode> {
    let valid = Arc::clone(&state.passwords)
        .matches_blocking(user.password, Password::new(body.current_password))
        .await?;
    if !valid {
        tracing::debug!(user = %user.id, "password change with wrong current password");
        return Err(ServerError::Unauthorized(AuthFailure::InvalidCredentials));
    }

    let password = Arc::clone(&state.passwords)
        .hash_blocking(Password::new(body.new_password))
        .await?;
    let revoked = state
        .store
        .update_password(user.id, &password, Scope::Authentication)
        .await?;

    tracing::info!(user = %user.id, revoked, "password changed");

    Ok(StatusCode::NO_CONTENT)
}
