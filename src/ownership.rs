//! Ownership checks for owned resources.
//!
//! Store mutations never re-check ownership, so every update or delete of an
//! owned resource must go through [`authorize`] first. Ownership cannot be
//! transferred; if that ever changes, the check and the write need to share a
//! transaction.

use crate::error::ServerError;
use crate::identity::Identity;
use crate::store::{StoreError, WorkoutStore};
use crate::workout::WorkoutId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Forbidden,
    NotFound,
}

impl Outcome {
    /// Map a refusal to its HTTP error.
    pub fn into_result(self) -> Result<(), ServerError> {
        match self {
            Outcome::Allowed => Ok(()),
            Outcome::Forbidden => Err(ServerError::Forbidden),
            Outcome::NotFound => Err(ServerError::NotFound),
        }
    }
}

/// Compare the recorded owner of a workout with the caller.
pub async fn authorize<S: WorkoutStore + ?Sized>(
    store: &S,
    id: WorkoutId,
    identity: &Identity,
) -> Result<Outcome, StoreError> {
    let Some(owner) = store.get_workout_owner(id).await? else {
        return Ok(Outcome::NotFound);
    };

    if identity.user_id() == Some(owner) {
        Ok(Outcome::Allowed)
    } else {
        tracing::info!(workout = %id, caller = ?identity.user_id(), "ownership check refused");
        Ok(Outcome::Forbidden)
    }
}
