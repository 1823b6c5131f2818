//! Middlewares for routes.
//!
//! Identity resolution is split in two stages. [`authenticate`] runs on every
//! API route and attaches an [`Identity`]; [`require_user`] is added per route
//! to reject anonymous callers.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::error::{AuthFailure, Result, ServerError};
use crate::identity::Identity;
use crate::token::Scope;

const BEARER: &str = "Bearer";

/// Extract `<secret>` from exactly `Bearer <secret>`.
fn bearer_secret(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let mut parts = value.split(' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER), Some(secret), None) if !secret.is_empty() => Some(secret),
        _ => None,
    }
}

/// Resolve the caller and attach it to the request.
///
/// No `Authorization` header means [`Identity::Anonymous`]. A header that is
/// present but malformed, unknown or expired is rejected right away.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let identity = match req.headers().get(header::AUTHORIZATION) {
        None => Identity::Anonymous,
        Some(value) => {
            let Some(secret) = bearer_secret(value) else {
                tracing::debug!("malformed authorization header");
                return Err(ServerError::Unauthorized(
                    AuthFailure::MalformedHeader,
                ));
            };

            match state
                .tokens
                .resolve(&*state.store, secret, Scope::Authentication)
                .await?
            {
                Identity::Anonymous => {
                    tracing::debug!("unknown or expired bearer token");
                    return Err(ServerError::Unauthorized(
                        AuthFailure::InvalidToken,
                    ));
                },
                identity => identity,
            }
        },
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Reject anonymous callers.
pub async fn require_user(
    identity: Identity,
    req: Request,
    next: Next,
) -> Result<Response> {
    if !identity.is_authenticated() {
        return Err(ServerError::Unauthorized(AuthFailure::Required));
    }

    Ok(next.run(req).await)
}
