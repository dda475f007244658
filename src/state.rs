use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use roster_config::{LoggingConfig, StoreBackend, StoreConfig};
use roster_db::{MemoryStore, PgStore, Store, init_db_pool};
use tracing::{info, warn};

use crate::logging::init_logging;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub backend: StoreBackend,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, backend: StoreBackend) -> Self {
        Self { store, backend }
    }

    /// A fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), StoreBackend::Memory)
    }

    #[inline]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

pub async fn init_app_state(config: &StoreConfig) -> anyhow::Result<AppState> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(AppState::in_memory())
        }
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("DATABASE_URL must be set when ROSTER_STORE=postgres")?;
            let pool = init_db_pool(database)
                .await
                .context("Failed to connect to PostgreSQL")?;

            Ok(AppState::new(
                Arc::new(PgStore::new(pool)),
                StoreBackend::Postgres,
            ))
        }
    }
}

/// Process startup for embedders: loads `.env`, installs console logging and
/// opens the configured store.
pub async fn bootstrap() -> anyhow::Result<AppState> {
    roster_config::load_dotenv();

    if let Err(err) = init_logging(&LoggingConfig::from_env()) {
        warn!(error = %err, "Logging was already initialized");
    }

    init_app_state(&StoreConfig::from_env()).await
}
