//! In-memory store used by unit and handler tests.
//!
//! Multi-row writes are staged and only committed once every row is
//! accepted, matching the transactional behaviour of [`super::PgStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Result, StoreError, TokenStore, UserStore, WorkoutStore};
use crate::crypto::PasswordHash;
use crate::token::{Scope, TokenHash};
use crate::user::{NewUser, ProfileChanges, User, UserId};
use crate::workout::{
    ExerciseDraft, Workout, WorkoutDraft, WorkoutExercise, WorkoutId, WorkoutPatch,
};

const EXERCISE_CONSTRAINT: &str = "valid_workout_exercise";

#[derive(Debug, Clone)]
struct TokenRow {
    user_id: UserId,
    expires_at: DateTime<Utc>,
    scope: Scope,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: HashMap<TokenHash, TokenRow>,
    workouts: BTreeMap<WorkoutId, Workout>,
    next_user: i64,
    next_workout: i64,
    next_exercise: i64,
}

impl Tables {
    /// Stage child rows. Nothing is written to `self` besides id sequences.
    fn stage_exercises(
        &mut self,
        exercises: &[ExerciseDraft],
        fail_at: Option<usize>,
    ) -> Result<Vec<WorkoutExercise>> {
        let mut staged = Vec::with_capacity(exercises.len());

        for (index, exercise) in exercises.iter().enumerate() {
            if fail_at == Some(index) {
                return Err(StoreError::Sql(sqlx::Error::Protocol(format!(
                    "injected failure on exercise {index}"
                ))));
            }
            if !exercise.has_single_measure() {
                return Err(StoreError::Constraint(
                    EXERCISE_CONSTRAINT.to_owned(),
                ));
            }

            self.next_exercise += 1;
            staged.push(exercise.clone().into_exercise(self.next_exercise));
        }

        Ok(staged)
    }

    fn taken(&self, except: Option<UserId>, username: Option<&str>, email: Option<&str>) -> Result<()> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if username == Some(user.username.as_str()) {
                return Err(StoreError::Conflict {
                    field: "username".into(),
                });
            }
            if email == Some(user.email.as_str()) {
                return Err(StoreError::Conflict {
                    field: "email".into(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_exercise_insert_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `index`-th exercise insert of every following workout write
    /// fail like a lost connection would.
    pub fn fail_exercise_insert_at(&self, index: usize) {
        *self.fail_exercise_insert_at.lock().unwrap() = Some(index);
    }

    pub fn token_count(&self) -> usize {
        self.tables.lock().unwrap().tokens.len()
    }

    pub fn workout_count(&self) -> usize {
        self.tables.lock().unwrap().workouts.len()
    }

    fn fail_at(&self) -> Option<usize> {
        *self.fail_exercise_insert_at.lock().unwrap()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().unwrap();
        tables.taken(None, Some(&user.username), Some(&user.email))?;

        tables.next_user += 1;
        let now = Utc::now();
        let user = User {
            id: UserId(tables.next_user),
            username: user.username,
            email: user.email,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>> {
        let mut tables = self.tables.lock().unwrap();
        tables.taken(
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn update_password(
        &self,
        id: UserId,
        password: &PasswordHash,
        revoke: Scope,
    ) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.get_mut(&id) {
            user.password = password.clone();
            user.updated_at = Utc::now();
        }

        let before = tables.tokens.len();
        tables
            .tokens
            .retain(|_, row| !(row.user_id == id && row.scope == revoke));
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn store_token(
        &self,
        hash: &TokenHash,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        scope: Scope,
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if tables.tokens.contains_key(hash) {
            return Err(StoreError::Conflict {
                field: "hash".into(),
            });
        }

        tables.tokens.insert(
            *hash,
            TokenRow {
                user_id,
                expires_at,
                scope,
            },
        );
        Ok(())
    }

    async fn find_active_token_owner(
        &self,
        hash: &TokenHash,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .tokens
            .get(hash)
            .filter(|row| row.scope == scope && row.expires_at > now)
            .and_then(|row| tables.users.get(&row.user_id))
            .cloned())
    }

    async fn revoke_tokens(
        &self,
        user_id: UserId,
        scope: Scope,
    ) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.tokens.len();
        tables
            .tokens
            .retain(|_, row| !(row.user_id == user_id && row.scope == scope));
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl WorkoutStore for MemoryStore {
    async fn persist_workout(
        &self,
        owner: UserId,
        draft: WorkoutDraft,
    ) -> Result<Workout> {
        let fail_at = self.fail_at();
        let mut tables = self.tables.lock().unwrap();

        tables.next_workout += 1;
        let id = WorkoutId(tables.next_workout);
        let exercises = tables.stage_exercises(&draft.exercises, fail_at)?;

        let workout = Workout {
            id,
            user_id: owner,
            name: draft.name,
            description: draft.description,
            duration_minutes: draft.duration_minutes,
            calories_burned: draft.calories_burned,
            exercises,
        };
        tables.workouts.insert(id, workout.clone());

        Ok(workout)
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        Ok(self.tables.lock().unwrap().workouts.get(&id).cloned())
    }

    async fn get_workout_owner(&self, id: WorkoutId) -> Result<Option<UserId>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .workouts
            .get(&id)
            .map(|workout| workout.user_id))
    }

    async fn update_workout(
        &self,
        id: WorkoutId,
        patch: WorkoutPatch,
    ) -> Result<Option<Workout>> {
        let fail_at = self.fail_at();
        let mut tables = self.tables.lock().unwrap();

        let Some(mut workout) = tables.workouts.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(exercises) = &patch.exercises {
            workout.exercises = tables.stage_exercises(exercises, fail_at)?;
        }
        if let Some(name) = patch.name {
            workout.name = name;
        }
        if let Some(description) = patch.description {
            workout.description = description;
        }
        if let Some(duration_minutes) = patch.duration_minutes {
            workout.duration_minutes = duration_minutes;
        }
        if let Some(calories_burned) = patch.calories_burned {
            workout.calories_burned = calories_burned;
        }
        tables.workouts.insert(id, workout.clone());

        Ok(Some(workout))
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<bool> {
        Ok(self.tables.lock().unwrap().workouts.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::draft;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: PasswordHash::from_phc("phc"),
        }
    }

    #[tokio::test]
    async fn test_rollback_on_child_failure() {
        const EXERCISES: usize = 6;

        let store = MemoryStore::new();
        let owner = store.create_user(new_user("alice")).await.unwrap().id;
        store.fail_exercise_insert_at(EXERCISES / 2);

        let err = store
            .persist_workout(owner, draft(EXERCISES))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Sql(_)));
        assert_eq!(store.workout_count(), 0);
        assert!(store.get_workout(WorkoutId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rollback_keeps_previous_exercises() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("alice")).await.unwrap().id;
        let created = store.persist_workout(owner, draft(2)).await.unwrap();

        let mut broken = draft(3);
        broken.name = "renamed".into();
        broken.exercises[1].duration_seconds = Some(20);
        let err = store
            .update_workout(created.id, broken.into())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        assert_eq!(store.get_workout(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_unique_username() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "username"));
    }

    #[tokio::test]
    async fn test_patch_without_exercises_keeps_them() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("alice")).await.unwrap().id;
        let created = store.persist_workout(owner, draft(2)).await.unwrap();

        let patch = WorkoutPatch {
            name: Some("renamed".into()),
            ..WorkoutPatch::default()
        };
        let updated = store.update_workout(created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.exercises, created.exercises);
        assert_eq!(updated.duration_minutes, created.duration_minutes);
        assert!(
            store
                .update_workout(WorkoutId(404), WorkoutPatch::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_password_change_revokes_only_that_user() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap().id;
        let bob = store.create_user(new_user("bob")).await.unwrap().id;
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        for (user, plain) in [(alice, "a1"), (alice, "a2"), (bob, "b1")] {
            store
                .store_token(&TokenHash::of(plain), user, expires_at, Scope::Authentication)
                .await
                .unwrap();
        }

        let replaced = PasswordHash::from_phc("new-phc");
        let revoked = store
            .update_password(alice, &replaced, Scope::Authentication)
            .await
            .unwrap();

        assert_eq!(revoked, 2);
        assert_eq!(store.token_count(), 1);
        let found = store.find_user_by_id(alice).await.unwrap().unwrap();
        assert_eq!(found.password, replaced);
    }
}
