// SQLite IdempotencyCache Implementation
//
// Key -> job-id rows with a TTL; expired rows behave as misses and are
// lazily deleted on read.

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::error::Result;
use scribe_core::port::{IdempotencyCache, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteIdempotencyCache {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteIdempotencyCache {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl IdempotencyCache for SqliteIdempotencyCache {
    async fn put(&self, key: &str, job_id: &str, ttl_ms: i64) -> Result<()> {
        let expires_at = self.time_provider.now_millis() + ttl_ms;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO idempotency_keys (key, job_id, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(job_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.time_provider.now_millis();

        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT job_id, expires_at FROM idempotency_keys WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        match row {
            Some((job_id, expires_at)) if expires_at > now => Ok(Some(job_id)),
            Some(_) => {
                // Expired: treat as miss and reclaim the row.
                sqlx::query("DELETE FROM idempotency_keys WHERE key = ?")
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
