//! PostgreSQL connection pool initialization.

use roster_config::DatabaseConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Creates a PostgreSQL connection pool from the given config.
///
/// The returned pool is cheaply cloneable; create it once at startup and hand
/// it to [`crate::PgStore::new`].
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}
