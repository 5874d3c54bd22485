// SQLite ChunkRepository Implementation
//
// SQLite has no vector index, so the age filter runs in SQL and the cosine
// ranking runs in-process over the filtered candidate set. Embeddings are
// stored as JSON arrays.

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::domain::{cosine_distance, Chunk, JobId};
use scribe_core::error::Result;
use scribe_core::port::{ChunkRepository, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub struct SqliteChunkRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteChunkRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn insert_many(&self, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for chunk in chunks {
            let embedding = serde_json::to_string(&chunk.embedding)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, job_id, content, embedding, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.job_id)
            .bind(&chunk.content)
            .bind(embedding)
            .bind(chunk.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        max_age_days: Option<i64>,
    ) -> Result<Vec<Chunk>> {
        // Inclusive cutoff: a chunk created exactly at now - max_age_days
        // is eligible.
        let rows: Vec<ChunkRow> = match max_age_days {
            Some(days) => {
                let cutoff = self.time_provider.now_millis() - days * MILLIS_PER_DAY;
                sqlx::query_as("SELECT * FROM chunks WHERE created_at >= ?")
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query_as("SELECT * FROM chunks").fetch_all(&self.pool).await,
        }
        .map_err(map_sqlx_error)?;

        let mut ranked: Vec<(f32, Chunk)> = rows
            .into_iter()
            .filter_map(|row| match row.into_chunk() {
                Some(chunk) => {
                    Some((cosine_distance(query_embedding, &chunk.embedding), chunk))
                }
                None => None,
            })
            .collect();

        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ranked.into_iter().take(limit).map(|(_, chunk)| chunk).collect())
    }

    async fn count_by_job(&self, job_id: &JobId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChunkRow {
    id: String,
    job_id: String,
    content: String,
    embedding: String,
    created_at: i64,
}

impl ChunkRow {
    fn into_chunk(self) -> Option<Chunk> {
        match serde_json::from_str::<Vec<f32>>(&self.embedding) {
            Ok(embedding) => Some(Chunk {
                id: self.id,
                job_id: self.job_id,
                content: self.content,
                embedding,
                created_at: self.created_at,
            }),
            Err(e) => {
                warn!(chunk_id = %self.id, error = %e, "Unreadable embedding, skipping chunk");
                None
            }
        }
    }
}
