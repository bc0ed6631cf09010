use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{InMemoryStore, PgStore, Store};

/// Picks the store backend: PostgreSQL when `DATABASE_URL` is set, otherwise
/// the seeded in-memory store (lost on restart).
pub async fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database_url.as_deref() {
        Some(url) => Ok(Arc::new(open_pg_store(url).await?)),
        None => {
            warn!("DATABASE_URL not set, using in-memory store with demo data");
            Ok(Arc::new(InMemoryStore::seeded()?))
        }
    }
}

/// Connects, applies the embedded migrations and seeds an empty database.
async fn open_pg_store(database_url: &str) -> Result<PgStore> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PgStore::new(pool);
    store
        .run_migrations()
        .await
        .context("Failed to apply database migrations")?;
    store.seed_if_empty().await?;

    info!("PostgreSQL store ready");
    Ok(store)
}
