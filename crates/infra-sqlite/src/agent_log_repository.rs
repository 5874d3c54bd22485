// SQLite AgentLogRepository Implementation

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::domain::AgentLog;
use scribe_core::error::Result;
use scribe_core::port::AgentLogRepository;
use sqlx::SqlitePool;

pub struct SqliteAgentLogRepository {
    pool: SqlitePool,
}

impl SqliteAgentLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentLogRepository for SqliteAgentLogRepository {
    async fn insert(&self, log: &AgentLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_logs (id, job_id, agent_name, role, content, tool_calls, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.job_id)
        .bind(&log.agent_name)
        .bind(log.role.to_string())
        .bind(&log.content)
        .bind(log.tool_calls.as_ref().map(|v| v.to_string()))
        .bind(log.timestamp)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
