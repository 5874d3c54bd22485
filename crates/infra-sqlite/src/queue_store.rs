// SQLite WorkQueue Implementation
//
// Durable FIFO with at-least-once delivery. The claim is a single atomic
// UPDATE ... RETURNING: concurrent workers never pop the same message.
// Acked messages are deleted; claims orphaned by a crash go back to
// delivery via requeue_stale.

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::error::Result;
use scribe_core::port::{QueueMessage, TimeProvider, WorkQueue};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

const STATE_PENDING: &str = "PENDING";
const STATE_IN_FLIGHT: &str = "IN_FLIGHT";

pub struct SqliteWorkQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteWorkQueue {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl WorkQueue for SqliteWorkQueue {
    async fn enqueue(&self, kind: &str, payload: serde_json::Value) -> Result<()> {
        let now = self.time_provider.now_millis();
        sqlx::query(
            r#"
            INSERT INTO queue_messages (kind, payload, state, enqueued_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(kind)
        .bind(payload.to_string())
        .bind(STATE_PENDING)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(kind = %kind, "Message enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueueMessage>> {
        let now = self.time_provider.now_millis();

        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            UPDATE queue_messages
            SET state = ?, claimed_at = ?
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE state = ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING id, kind, payload, enqueued_at
            "#,
        )
        .bind(STATE_IN_FLIGHT)
        .bind(now)
        .bind(STATE_PENDING)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_message()))
    }

    async fn ack(&self, message_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM queue_messages WHERE id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn requeue_stale(&self, cutoff_ms: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE queue_messages
            SET state = ?, claimed_at = NULL
            WHERE state = ? AND claimed_at < ?
            "#,
        )
        .bind(STATE_PENDING)
        .bind(STATE_IN_FLIGHT)
        .bind(cutoff_ms)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn depth(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_messages WHERE state IN (?, ?)",
        )
        .bind(STATE_PENDING)
        .bind(STATE_IN_FLIGHT)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: i64,
    kind: String,
    payload: String,
    enqueued_at: i64,
}

impl QueueRow {
    fn into_message(self) -> QueueMessage {
        let payload =
            serde_json::from_str(&self.payload).unwrap_or(serde_json::Value::Null);
        QueueMessage {
            id: self.id,
            kind: self.kind,
            payload,
            enqueued_at: self.enqueued_at,
        }
    }
}
