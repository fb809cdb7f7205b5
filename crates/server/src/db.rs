use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create a PostgreSQL connection pool.
/// Returns None if PostgreSQL is not configured or unreachable.
pub async fn init_pg_pool(config: &flightdeck_core::config::PostgresConfig) -> Option<PgPool> {
    if !config.is_configured() {
        warn!("PG_USERNAME not configured; roster and maintenance endpoints will answer 503");
        return None;
    }

    match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await
    {
        Ok(pool) => {
            info!(host = %config.host, database = %config.database, "PostgreSQL connected");
            Some(pool)
        }
        Err(e) => {
            warn!("Failed to connect to PostgreSQL: {}; data endpoints disabled", e);
            None
        }
    }
}

/// Apply pending migrations from `migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}
