//! Database models for PostgreSQL.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::crypto::PasswordHash;
use crate::user::{User, UserId};
use crate::workout::{Workout, WorkoutExercise, WorkoutId};

pub const USER_COLUMNS: &str =
    "id, username, email, password_hash, created_at, updated_at";

/// User record as stored in the database.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: UserId(record.id),
            username: record.username,
            email: record.email,
            password: PasswordHash::from_phc(record.password_hash),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Workout row, without its exercises.
#[derive(Debug, Clone, FromRow)]
pub struct WorkoutRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
}

impl WorkoutRecord {
    pub fn with_exercises(self, exercises: Vec<WorkoutExercise>) -> Workout {
        Workout {
            id: WorkoutId(self.id),
            user_id: UserId(self.user_id),
            name: self.name,
            description: self.description,
            duration_minutes: self.duration_minutes,
            calories_burned: self.calories_burned,
            exercises,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseRecord {
    pub id: i64,
    pub name: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub weight: Option<f64>,
    pub notes: String,
    pub order_index: i32,
}

impl From<ExerciseRecord> for WorkoutExercise {
    fn from(record: ExerciseRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            sets: record.sets,
            reps: record.reps,
            duration_seconds: record.duration_seconds,
            weight: record.weight,
            notes: record.notes,
            order_index: record.order_index,
        }
    }
}
