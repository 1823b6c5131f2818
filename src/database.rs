//! PostgreSQL pool and schema migrations.

use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;

use crate::config::Postgres;

/// Open the connection pool.
pub async fn connect(config: &Postgres) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size())
        .connect(&config.connection_url())
        .await?;

    tracing::info!(pool_size = config.pool_size(), "postgres connected");

    Ok(pool)
}

/// Run the embedded `migrations/` scripts.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!().run(pool).await
}
