//! SQLite-backed dedup store.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::models::SeenCode;
use crate::common::{DedupKey, RelayError, RelayResult};
use crate::kernel::BaseDedupStore;

#[derive(Clone)]
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", database_url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .context("Failed to open dedup database")?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is its own database; keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count(&self) -> RelayResult<i64> {
        SeenCode::count(&self.pool).await.map_err(unavailable)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unavailable(e: anyhow::Error) -> RelayError {
    RelayError::StoreUnavailable(format!("{:#}", e))
}

#[async_trait]
impl BaseDedupStore for SqliteDedupStore {
    async fn exists(&self, key: &DedupKey) -> RelayResult<bool> {
        SeenCode::exists(key, &self.pool).await.map_err(unavailable)
    }

    async fn commit(&self, key: &DedupKey) -> RelayResult<()> {
        SeenCode::record(key, &self.pool).await.map_err(unavailable)
    }
}
