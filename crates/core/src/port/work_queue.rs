// Work Queue Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// A message claimed from the queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: i64,
    /// Handler kind (see `application::pipeline::kind`).
    pub kind: String,
    pub payload: serde_json::Value,
    pub enqueued_at: i64, // epoch ms
}

/// Durable FIFO work queue with at-least-once delivery.
///
/// Ordering is FIFO per kind; ordering across kinds is unspecified. A
/// claimed message that is never acked (worker crash) is returned to
/// delivery by `requeue_stale`. Handlers must therefore tolerate
/// redelivery.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Fire-and-forget enqueue.
    async fn enqueue(&self, kind: &str, payload: serde_json::Value) -> Result<()>;

    /// Atomically claim the next deliverable message, if any.
    async fn dequeue(&self) -> Result<Option<QueueMessage>>;

    /// Acknowledge (and drop) a claimed message.
    async fn ack(&self, message_id: i64) -> Result<()>;

    /// Return messages claimed before `cutoff_ms` to delivery.
    /// Returns the number of messages requeued.
    async fn requeue_stale(&self, cutoff_ms: i64) -> Result<u64>;

    /// Number of messages currently awaiting delivery or in flight.
    async fn depth(&self) -> Result<i64>;
}
