//! Partially update a workout.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::identity::Identity;
use crate::ownership::authorize;
use crate::router::{PathId, Valid};
use crate::workout::{Workout, WorkoutId, WorkoutPatch};

/// `PATCH /workouts/{workout_id}`.
///
/// The body is only decoded once the workout is known to exist and to belong
/// to the caller.
pub async fn handler(
    State(state): State<AppState>,
    identity: Identity,
    PathId(id): PathId<WorkoutId>,
    body: Bytes,
) -> Result<Json<Workout>> {
    authorize(&*state.store, id, &identity).await?.into_result()?;

    let Valid(patch) = Valid::<WorkoutPatch>::from_bytes(&body)?;
    let workout = state
        .store
        .update_workout(id, patch)
        .await?
        .ok_or(ServerError::NotFound)?;

    Ok(Json(workout))
}
