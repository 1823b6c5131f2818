//! HTTP routes.
//!
//! Every API route is declared once in [`routes`] together with its
//! [`Policy`]. The `authenticate` stage wraps the whole table; the policy
//! decides whether `require_user` is added on top.

pub mod status;
pub mod tokens;
pub mod users;
pub mod workouts;

use axum::extract::{FromRequest, FromRequestParts, Json, Request};
use axum::middleware::from_fn;
use axum::routing::{MethodRouter, delete, get, patch, post, put};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;
use crate::{AppState, middleware};

/// Whether a route accepts anonymous callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AnonymousAllowed,
    AuthenticationRequired,
}

impl Policy {
    fn apply(self, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
        match self {
            Policy::AnonymousAllowed => route,
            Policy::AuthenticationRequired => {
                route.route_layer(from_fn(middleware::require_user))
            },
        }
    }
}

/// The API route table.
///
/// One path may appear several times with different methods and policies;
/// axum merges them.
pub fn routes() -> Vec<(&'static str, Policy, MethodRouter<AppState>)> {
    use Policy::*;

    vec![
        ("/users", AnonymousAllowed, post(users::create::handler)),
        ("/users/{user_id}", AnonymousAllowed, get(users::get::handler)),
        (
            "/users/@me",
            AuthenticationRequired,
            get(users::get::me).patch(users::update::handler),
        ),
        (
            "/users/@me/password",
            AuthenticationRequired,
            put(users::password::handler),
        ),
        (
            "/tokens/authentication",
            AnonymousAllowed,
            post(tokens::create),
        ),
        (
            "/tokens/authentication",
            AuthenticationRequired,
            delete(tokens::revoke),
        ),
        (
            "/workouts",
            AuthenticationRequired,
            post(workouts::create::handler),
        ),
        (
            "/workouts/{workout_id}",
            AnonymousAllowed,
            get(workouts::get::handler),
        ),
        (
            "/workouts/{workout_id}",
            AuthenticationRequired,
            patch(workouts::update::handler).delete(workouts::delete::handler),
        ),
    ]
}

/// Fold [`routes`] into a router, each entry with its policy applied.
pub fn api() -> axum::Router<AppState> {
    routes()
        .into_iter()
        .fold(axum::Router::new(), |router, (path, policy, route)| {
            router.route(path, policy.apply(route))
        })
}

/// JSON body that passed [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T: DeserializeOwned + Validate> Valid<T> {
    /// Decode and validate a body that was read as raw bytes, for handlers
    /// that must run other checks before looking at the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ServerError> {
        let Json(value) = Json::<T>::from_bytes(bytes)?;
        value.validate()?;
        Ok(Valid(value))
    }
}

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Path parameter whose rejection renders as a [`ServerError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServerError))]
pub struct PathId<T>(pub T);
