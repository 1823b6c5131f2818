//! Resource store ports.
//!
//! Handlers and the identity core only talk to these traits. [`PgStore`] is
//! the production adapter; tests use the in-memory adapter.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::crypto::PasswordHash;
use crate::token::{Scope, TokenHash};
use crate::user::{NewUser, ProfileChanges, User, UserId};
use crate::workout::{Workout, WorkoutDraft, WorkoutId, WorkoutPatch};

pub use postgres::PgStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{field} is already taken")]
    Conflict { field: String },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a database error. Only unique and check violations are
    /// client errors; everything else is a store failure.
    pub fn from_sql(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        let Some(db) = err.as_database_error() else {
            return Self::Sql(err);
        };

        match db.kind() {
            ErrorKind::UniqueViolation => Self::Conflict {
                field: conflicting_field(db.constraint()),
            },
            ErrorKind::CheckViolation => {
                Self::Constraint(db.constraint().unwrap_or("check").to_owned())
            },
            _ => Self::Sql(err),
        }
    }
}

/// `users_username_key` -> `username`.
fn conflicting_field(constraint: Option<&str>) -> String {
    constraint
        .and_then(|name| name.strip_suffix("_key"))
        .and_then(|name| name.split_once('_'))
        .map(|(_, field)| field.to_owned())
        .unwrap_or_else(|| "value".to_owned())
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. Username and email must be unique.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Apply username/email changes. `None` if the user does not exist.
    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>>;

    /// Replace the password hash wholesale and delete every token of the
    /// user with scope `revoke`, in one transaction. Returns how many tokens
    /// were deleted.
    async fn update_password(
        &self,
        id: UserId,
        password: &PasswordHash,
        revoke: Scope,
    ) -> Result<u64>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a token. Only its hash is ever stored.
    async fn store_token(
        &self,
        hash: &TokenHash,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        scope: Scope,
    ) -> Result<()>;

    /// Owner of the token matching `(hash, scope)` with `expires_at > now`.
    async fn find_active_token_owner(
        &self,
        hash: &TokenHash,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// Delete every token of `user_id` with `scope`, returning how many.
    async fn revoke_tokens(&self, user_id: UserId, scope: Scope)
    -> Result<u64>;
}

#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Insert the workout then its exercises in one transaction.
    async fn persist_workout(
        &self,
        owner: UserId,
        draft: WorkoutDraft,
    ) -> Result<Workout>;

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>>;

    async fn get_workout_owner(&self, id: WorkoutId) -> Result<Option<UserId>>;

    /// Apply the fields set in `patch` in one transaction. Exercises are
    /// replaced only when `patch.exercises` is present. `None` if the workout
    /// does not exist.
    ///
    /// Performs no ownership check.
    async fn update_workout(
        &self,
        id: WorkoutId,
        patch: WorkoutPatch,
    ) -> Result<Option<Workout>>;

    /// `false` if nothing was deleted. Performs no ownership check.
    async fn delete_workout(&self, id: WorkoutId) -> Result<bool>;
}

/// Every port the HTTP layer needs.
pub trait Store: UserStore + TokenStore + WorkoutStore {}

impl<T: UserStore + TokenStore + WorkoutStore> Store for T {}
