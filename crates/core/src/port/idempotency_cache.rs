// Idempotency Cache Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Default retention for idempotency keys: 24 hours.
pub const IDEMPOTENCY_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Short-lived key -> job-id store. Eviction by TTL only.
///
/// Failure of this store must not fail a request: callers treat errors as a
/// cache miss.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    async fn put(&self, key: &str, job_id: &str, ttl_ms: i64) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
}
