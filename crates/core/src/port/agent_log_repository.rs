// Agent Log Repository Port (Interface)

use crate::domain::AgentLog;
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for agent conversation turns. Callers treat writes as
/// best-effort: a failed insert is logged, never propagated into the turn.
#[async_trait]
pub trait AgentLogRepository: Send + Sync {
    async fn insert(&self, log: &AgentLog) -> Result<()>;
}
