//! Delete a workout.

use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::identity::Identity;
use crate::ownership::authorize;
use crate::router::PathId;
use crate::workout::WorkoutId;

/// `DELETE /workouts/{workout_id}`.
///
/// A workout removed by a concurrent request after the ownership check still
/// answers 204. A workout already gone before the check answers 404.
pub async fn handler(
    State(state): State<AppState>,
    identity: Identity,
    PathId(id): PathId<WorkoutId>,
) -> Result<StatusCode> {
    authorize(&*state.store, id, &identity).await?.into_result()?;

    if !state.store.delete_workout(id).await? {
        tracing::debug!(workout = %id, "workout already deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}
