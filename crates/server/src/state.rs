use flightdeck_core::Config;
use flightdeck_maintenance::DueThresholds;
use sqlx::PgPool;

use crate::auth::SessionKey;

/// Shared, immutable per-process state handed to every handler.
pub struct AppState {
    pub config: Config,
    /// `None` when PostgreSQL is not configured; data endpoints answer 503.
    pub pg_pool: Option<PgPool>,
    pub session_key: SessionKey,
    pub thresholds: DueThresholds,
}

impl AppState {
    pub fn new(config: Config, pg_pool: Option<PgPool>, session_key: SessionKey) -> Self {
        let thresholds = DueThresholds::from(config.maintenance);
        Self {
            config,
            pg_pool,
            session_key,
            thresholds,
        }
    }
}
