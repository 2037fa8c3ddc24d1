use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::common::DedupKey;

/// A `(code, destination)` pair that has already been forwarded
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeenCode {
    pub code: String,
    pub destination: String,
    pub first_seen_at: NaiveDateTime,
}

impl SeenCode {
    pub async fn exists(key: &DedupKey, pool: &SqlitePool) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM seen_codes WHERE code = ? AND destination = ? LIMIT 1",
        )
        .bind(&key.code)
        .bind(&key.destination)
        .fetch_optional(pool)
        .await?;

        Ok(found.is_some())
    }

    /// Record a pair (upsert - ignores duplicates)
    ///
    /// Uses ON CONFLICT DO NOTHING so a concurrent committer of the same pair
    /// is not an error.
    pub async fn record(key: &DedupKey, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "INSERT INTO seen_codes (code, destination)
             VALUES (?, ?)
             ON CONFLICT (code, destination) DO NOTHING",
        )
        .bind(&key.code)
        .bind(&key.destination)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find(key: &DedupKey, pool: &SqlitePool) -> Result<Option<Self>> {
        let seen = sqlx::query_as::<_, SeenCode>(
            "SELECT code, destination, first_seen_at FROM seen_codes
             WHERE code = ? AND destination = ?",
        )
        .bind(&key.code)
        .bind(&key.destination)
        .fetch_optional(pool)
        .await?;

        Ok(seen)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM seen_codes")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
