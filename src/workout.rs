//! Workouts and their exercises.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::user::UserId;

/// Store-assigned workout identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct WorkoutId(pub i64);

impl std::fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted workout. `user_id` is its owner and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: WorkoutId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
    pub exercises: Vec<WorkoutExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: i64,
    pub name: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub weight: Option<f64>,
    pub notes: String,
    pub order_index: i32,
}

/// Workout as submitted by a client, before the store assigns ids.
#[derive(Debug, Clone, PartialEq, Validate, Deserialize)]
pub struct WorkoutDraft {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be 1 to 100 characters long."
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(range(min = 0))]
    pub duration_minutes: i32,
    #[validate(range(min = 0))]
    pub calories_burned: i32,
    #[serde(default)]
    #[validate(nested)]
    pub exercises: Vec<ExerciseDraft>,
}

/// Partial update of a workout. Absent fields keep their stored value and
/// `exercises`, when present, replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Validate, Deserialize)]
pub struct WorkoutPatch {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be 1 to 100 characters long."
    ))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0))]
    pub calories_burned: Option<i32>,
    #[validate(nested)]
    pub exercises: Option<Vec<ExerciseDraft>>,
}

#[derive(Debug, Clone, PartialEq, Validate, Deserialize)]
#[validate(schema(function = "exactly_one_measure", skip_on_field_errors = false))]
pub struct ExerciseDraft {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1))]
    pub sets: i32,
    #[validate(range(min = 1))]
    pub reps: Option<i32>,
    #[validate(range(min = 1))]
    pub duration_seconds: Option<i32>,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub order_index: i32,
}

impl ExerciseDraft {
    /// Attach the store-assigned id.
    pub fn into_exercise(self, id: i64) -> WorkoutExercise {
        WorkoutExercise {
            id,
            name: self.name,
            sets: self.sets,
            reps: self.reps,
            duration_seconds: self.duration_seconds,
            weight: self.weight,
            notes: self.notes,
            order_index: self.order_index,
        }
    }

    /// Whether exactly one of `reps` and `duration_seconds` is set.
    pub fn has_single_measure(&self) -> bool {
        self.reps.is_some() != self.duration_seconds.is_some()
    }
}

fn exactly_one_measure(exercise: &ExerciseDraft) -> Result<(), ValidationError> {
    if exercise.has_single_measure() {
        Ok(())
    } else {
        Err(ValidationError::new("measure").with_message(
            "Exactly one of 'reps' or 'duration_seconds' must be set.".into(),
        ))
    }
}

#[cfg(test)]
pub(crate) fn draft(exercises: usize) -> WorkoutDraft {
    WorkoutDraft {
        name: "Leg day".into(),
        description: "squats until failure".into(),
        duration_minutes: 45,
        calories_burned: 400,
        exercises: (0..exercises)
            .map(|i| ExerciseDraft {
                name: format!("exercise {i}"),
                sets: 3,
                reps: Some(10),
                duration_seconds: None,
                weight: Some(60.0),
                notes: String::new(),
                order_index: i as i32,
            })
            .collect(),
    }
}

#[cfg(test)]
impl From<WorkoutDraft> for WorkoutPatch {
    fn from(draft: WorkoutDraft) -> Self {
        Self {
            name: Some(draft.name),
            description: Some(draft.description),
            duration_minutes: Some(draft.duration_minutes),
            calories_burned: Some(draft.calories_burned),
            exercises: Some(draft.exercises),
        }
    }
}
