//! PostgreSQL implementation of WorkoutStore.

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, Transaction};

use super::models::{ExerciseRecord, WorkoutRecord};
use super::{Catch, PgStore};
use crate::store::{Result, WorkoutStore};
use crate::user::UserId;
use crate::workout::{
    ExerciseDraft, Workout, WorkoutDraft, WorkoutExercise, WorkoutId, WorkoutPatch,
};

const WORKOUT_COLUMNS: &str =
    "id, user_id, name, description, duration_minutes, calories_burned";
const EXERCISE_COLUMNS: &str = "id, name, sets, reps, duration_seconds, weight, notes, order_index";

/// Insert child rows inside an open transaction.
async fn insert_exercises(
    tx: &mut Transaction<'_, Postgres>,
    workout_id: i64,
    exercises: Vec<ExerciseDraft>,
) -> Result<Vec<WorkoutExercise>> {
    let mut inserted = Vec::with_capacity(exercises.len());

    for exercise in exercises {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO workout_exercises (workout_id, name, sets, reps, duration_seconds, weight, notes, order_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(workout_id)
        .bind(&exercise.name)
        .bind(exercise.sets)
        .bind(exercise.reps)
        .bind(exercise.duration_seconds)
        .bind(exercise.weight)
        .bind(&exercise.notes)
        .bind(exercise.order_index)
        .fetch_one(&mut **tx)
        .await
        .catch()?;

        inserted.push(exercise.into_exercise(id));
    }

    Ok(inserted)
}

async fn fetch_exercises(
    conn: &mut PgConnection,
    workout_id: i64,
) -> Result<Vec<WorkoutExercise>> {
    let records = sqlx::query_as::<_, ExerciseRecord>(&format!(
        r#"
        SELECT {EXERCISE_COLUMNS}
        FROM workout_exercises
        WHERE workout_id = $1
        ORDER BY order_index, id
        "#
    ))
    .bind(workout_id)
    .fetch_all(conn)
    .await
    .catch()?;

    Ok(records.into_iter().map(Into::into).collect())
}

#[async_trait]
impl WorkoutStore for PgStore {
    async fn persist_workout(
        &self,
        owner: UserId,
        draft: WorkoutDraft,
    ) -> Result<Workout> {
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await.catch()?;

        let record = sqlx::query_as::<_, WorkoutRecord>(&format!(
            r#"
            INSERT INTO workouts (user_id, name, description, duration_minutes, calories_burned)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {WORKOUT_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.duration_minutes)
        .bind(draft.calories_burned)
        .fetch_one(&mut *tx)
        .await
        .catch()?;

        let exercises =
            insert_exercises(&mut tx, record.id, draft.exercises).await?;

        tx.commit().await.catch()?;

        Ok(record.with_exercises(exercises))
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        let Some(record) = sqlx::query_as::<_, WorkoutRecord>(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .catch()?
        else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await.catch()?;
        let exercises = fetch_exercises(&mut *conn, record.id).await?;

        Ok(Some(record.with_exercises(exercises)))
    }

    async fn get_workout_owner(&self, id: WorkoutId) -> Result<Option<UserId>> {
        let owner = sqlx::query_as::<_, (UserId,)>(
            "SELECT user_id FROM workouts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        Ok(owner.map(|(id,)| id))
    }

    async fn update_workout(
        &self,
        id: WorkoutId,
        patch: WorkoutPatch,
    ) -> Result<Option<Workout>> {
        let mut tx = self.pool.begin().await.catch()?;

        // Absent fields keep the stored value.
        let Some(record) = sqlx::query_as::<_, WorkoutRecord>(&format!(
            r#"
            UPDATE workouts
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                duration_minutes = COALESCE($4, duration_minutes),
                calories_burned = COALESCE($5, calories_burned),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {WORKOUT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.duration_minutes)
        .bind(patch.calories_burned)
        .fetch_optional(&mut *tx)
        .await
        .catch()?
        else {
            return Ok(None);
        };

        let exercises = match patch.exercises {
            Some(exercises) => {
                sqlx::query("DELETE FROM workout_exercises WHERE workout_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .catch()?;

                insert_exercises(&mut tx, record.id, exercises).await?
            },
            None => fetch_exercises(&mut *tx, record.id).await?,
        };

        tx.commit().await.catch()?;

        Ok(Some(record.with_exercises(exercises)))
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workouts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .catch()?;

        Ok(result.rows_affected() > 0)
    }
}
