// SQLite TaskRepository Implementation
//
// The guarded mutators express the task state machine as conditional
// UPDATEs; rows_affected tells the caller whether it won the edge.

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::domain::{JobId, ResearchTask, TaskId, TaskStatus};
use scribe_core::error::Result;
use scribe_core::port::{TaskRepository, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteTaskRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, task: &ResearchTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, job_id, title, status, result, feedback,
                hypotheses, evidence_rating, contradictions,
                rejection_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.job_id)
        .bind(&task.title)
        .bind(task.status.to_string())
        .bind(&task.result)
        .bind(&task.feedback)
        .bind(task.hypotheses.as_ref().map(|v| v.to_string()))
        .bind(task.evidence_rating.as_ref().map(|v| v.to_string()))
        .bind(task.contradictions.as_ref().map(|v| v.to_string()))
        .bind(task.rejection_count)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<ResearchTask>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_task()))
    }

    async fn list_by_job(&self, job_id: &JobId) -> Result<Vec<ResearchTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE job_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_task()).collect())
    }

    async fn list_approved(&self, job_id: &JobId) -> Result<Vec<ResearchTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE job_id = ? AND status = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(job_id)
        .bind(TaskStatus::Approved.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_task()).collect())
    }

    async fn update_status_if(
        &self,
        id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.to_string())
        .bind(now)
        .bind(id)
        .bind(from.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_hypothesizing(
        &self,
        id: &TaskId,
        hypotheses: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET hypotheses = ?, status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(hypotheses.map(|v| v.to_string()))
        .bind(TaskStatus::Hypothesized.to_string())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::HypothesizingStarted.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_research(&self, id: &TaskId, result_text: &str) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET result = ?, status = ?, updated_at = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(result_text)
        .bind(TaskStatus::Researched.to_string())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::ResearchingStarted.to_string())
        .bind(TaskStatus::ResearchingRetry.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_scoring(
        &self,
        id: &TaskId,
        evidence_rating: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET evidence_rating = ?, status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(evidence_rating.map(|v| v.to_string()))
        .bind(TaskStatus::Scored.to_string())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::ScoringStarted.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_contradicting(
        &self,
        id: &TaskId,
        contradictions: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET contradictions = ?, status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(contradictions.map(|v| v.to_string()))
        .bind(TaskStatus::Contradicted.to_string())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::ContradictingStarted.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_review(
        &self,
        id: &TaskId,
        approved: bool,
        feedback: Option<&str>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = if approved {
            sqlx::query(
                "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            )
            .bind(TaskStatus::Approved.to_string())
            .bind(now)
            .bind(id)
            .bind(TaskStatus::ReviewStarted.to_string())
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE tasks
                SET status = ?, feedback = ?, rejection_count = rejection_count + 1,
                    updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(TaskStatus::Rejected.to_string())
            .bind(feedback)
            .bind(now)
            .bind(id)
            .bind(TaskStatus::ReviewStarted.to_string())
            .execute(&self.pool)
            .await
        }
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_rejected(&self, id: &TaskId, feedback: &str) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, feedback = ?, rejection_count = rejection_count + 1,
                updated_at = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(TaskStatus::Rejected.to_string())
        .bind(feedback)
        .bind(now)
        .bind(id)
        .bind(TaskStatus::ResearchingStarted.to_string())
        .bind(TaskStatus::ResearchingRetry.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn force_approve(&self, id: &TaskId) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(TaskStatus::Approved.to_string())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::Rejected.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    job_id: String,
    title: String,
    status: String,
    result: Option<String>,
    feedback: Option<String>,
    hypotheses: Option<String>,
    evidence_rating: Option<String>,
    contradictions: Option<String>,
    rejection_count: i32,
    created_at: i64,
    updated_at: i64,
}

impl TaskRow {
    fn into_task(self) -> ResearchTask {
        let status = match self.status.as_str() {
            "PENDING" => TaskStatus::Pending,
            "HYPOTHESIZING_STARTED" => TaskStatus::HypothesizingStarted,
            "HYPOTHESIZED" => TaskStatus::Hypothesized,
            "RESEARCHING_STARTED" => TaskStatus::ResearchingStarted,
            "RESEARCHED" => TaskStatus::Researched,
            "SCORING_STARTED" => TaskStatus::ScoringStarted,
            "SCORED" => TaskStatus::Scored,
            "CONTRADICTING_STARTED" => TaskStatus::ContradictingStarted,
            "CONTRADICTED" => TaskStatus::Contradicted,
            "REVIEW_STARTED" => TaskStatus::ReviewStarted,
            "APPROVED" => TaskStatus::Approved,
            "RESEARCHING_RETRY" => TaskStatus::ResearchingRetry,
            _ => TaskStatus::Rejected, // Default fallback
        };

        ResearchTask {
            id: self.id,
            job_id: self.job_id,
            title: self.title,
            status,
            result: self.result,
            feedback: self.feedback,
            hypotheses: self.hypotheses.and_then(|s| serde_json::from_str(&s).ok()),
            evidence_rating: self
                .evidence_rating
                .and_then(|s| serde_json::from_str(&s).ok()),
            contradictions: self
                .contradictions
                .and_then(|s| serde_json::from_str(&s).ok()),
            rejection_count: self.rejection_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
