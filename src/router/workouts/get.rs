use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::PathId;
use crate::workout::{Workout, WorkoutId};

/// `GET /workouts/{workout_id}`.
pub async fn handler(
    State(state): State<AppState>,
    PathId(id): PathId<WorkoutId>,
) -> Result<Json<Workout>> {
    state
        .store
        .get_workout(id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}
