// Chunk Repository Port (Interface) - vector storage and retrieval

use crate::domain::{Chunk, JobId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Insert a batch of chunks atomically (one transaction).
    async fn insert_many(&self, chunks: &[Chunk]) -> Result<()>;

    /// Nearest-neighbour search by cosine distance, ascending.
    ///
    /// When `max_age_days` is set, only chunks with
    /// `created_at >= now - max_age_days` are eligible; the cutoff itself is
    /// included.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        max_age_days: Option<i64>,
    ) -> Result<Vec<Chunk>>;

    /// Number of chunks stored for a job.
    async fn count_by_job(&self, job_id: &JobId) -> Result<i64>;
}
