//! Who is calling.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;

use crate::error::{AuthFailure, ServerError};
use crate::user::{User, UserId};

/// Identity resolved for a request by [`crate::middleware::authenticate`].
#[derive(Debug, Clone)]
pub enum Identity {
    /// No credentials were presented. Owns nothing.
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|user| user.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    /// Read the identity attached by the `authenticate` layer.
    ///
    /// # Panics
    ///
    /// Panics when no identity was attached. That only happens when a route
    /// reading the identity is mounted outside the `authenticate` layer,
    /// which is a bug in the route table.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        match extensions.get::<Identity>() {
            Some(identity) => identity.clone(),
            None => panic!(
                "no identity attached to request; route is not behind the `authenticate` layer"
            ),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

/// Authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        match Identity::from_extensions(&parts.extensions) {
            Identity::Authenticated(user) => Ok(CurrentUser(user)),
            Identity::Anonymous => {
                Err(ServerError::Unauthorized(AuthFailure::Required))
            },
        }
    }
}
