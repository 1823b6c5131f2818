//! Authentication token issuance and revocation.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::crypto::Password;
use crate::error::{AuthFailure, Result, ServerError};
use crate::identity::CurrentUser;
use crate::router::Valid;
use crate::telemetry::authentication_attempt;
use crate::token::Scope;

#[derive(Validate, Deserialize)]
pub struct Body {
    #[validate(length(min = 1, max = 50, message = "Username is required."))]
    username: String,
    #[validate(length(min = 1, max = 100, message = "Password is required."))]
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// `POST /tokens/authentication`.
pub async fn create(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let Some(user) = state.store.find_user_by_username(&body.username).await?
    else {
        authentication_attempt("unknown_user");
        tracing::debug!("login attempt for unknown username");
        return Err(ServerError::NotFound);
    };

    let valid = Arc::clone(&state.passwords)
        .matches_blocking(user.password.clone(), Password::new(body.password))
        .await?;
    if !valid {
        authentication_attempt("invalid_password");
        tracing::debug!(user = %user.id, "login attempt with wrong password");
        return Err(ServerError::Unauthorized(AuthFailure::InvalidCredentials));
    }

    let token = state.tokens.issue(user.id)?;
    state
        .store
        .store_token(&token.hash, token.user_id, token.expires_at, token.scope)
        .await?;

    authentication_attempt("success");
    tracing::info!(user = %user.id, expires_at = %token.expires_at, "authentication token issued");

    Ok((
        StatusCode::CREATED,
        Json(Response {
            token: token.plain.to_string(),
            expires_at: token.expires_at,
        }),
    ))
}

/// `DELETE /tokens/authentication`: sign out everywhere.
pub async fn revoke(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    let revoked = state
        .store
        .revoke_tokens(user.id, Scope::Authentication)
        .await?;
    tracing::info!(user = %user.id, revoked, "authentication tokens revoked");

    Ok(StatusCode::NO_CONTENT)
}
