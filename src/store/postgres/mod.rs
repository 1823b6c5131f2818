//! PostgreSQL implementation of the store ports.

mod models;
mod token_repository;
mod user_repository;
mod workout_repository;

use sqlx::PgPool;

use super::{Result, StoreError};

/// PostgreSQL resource store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new [`PgStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert `sqlx` results into store results.
trait Catch<T> {
    fn catch(self) -> Result<T>;
}

impl<T> Catch<T> for std::result::Result<T, sqlx::Error> {
    fn catch(self) -> Result<T> {
        self.map_err(StoreError::from_sql)
    }
}
