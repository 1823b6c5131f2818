//! Create a workout owned by the caller.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::router::Valid;
use crate::workout::{Workout, WorkoutDraft};

/// `POST /workouts`.
pub async fn handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(draft): Valid<WorkoutDraft>,
) -> Result<(StatusCode, Json<Workout>)> {
    let workout = state.store.persist_workout(user.id, draft).await?;
    tracing::info!(workout = %workout.id, user = %user.id, exercises = workout.exercises.len(), "workout created");

    Ok((StatusCode::CREATED, Json(workout)))
}
