//! Account registration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use validator::Validate;

use super::{validate_password, validate_username};
use crate::AppState;
use crate::crypto::Password;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{NewUser, User};

#[derive(Validate, Deserialize)]
pub struct Body {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters long."),
        custom(
            function = "validate_username",
            message = "Username may only contain letters, digits and underscores."
        )
    )]
    username: String,
    #[validate(
        length(min = 5, max = 100, message = "Email must be 5 to 100 characters long."),
        email(message = "Email must be formated.")
    )]
    email: String,
    #[validate(
        length(min = 8, max = 100, message = "Password must be 8 to 100 characters long."),
        custom(
            function = "validate_password",
            message = "Password must contain at least one digit."
        )
    )]
    password: String,
}

/// `POST /users`.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<User>)> {
    let password = Arc::clone(&state.passwords)
        .hash_blocking(Password::new(body.password))
        .await?;

    let user = state
        .store
        .create_user(NewUser {
            username: body.username,
            email: body.email,
            password,
        })
        .await?;

    tracing::info!(user = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}
