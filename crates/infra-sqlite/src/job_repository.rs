// SQLite JobRepository Implementation

use crate::error_map::map_sqlx_error;
use async_trait::async_trait;
use scribe_core::domain::{JobId, JobStatus, ResearchJob};
use scribe_core::error::Result;
use scribe_core::port::{JobRepository, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteJobRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &ResearchJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, idea, description, status, report, final_critique,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.idea)
        .bind(&job.description)
        .bind(job.status.to_string())
        .bind(job.report.as_ref().map(|v| v.to_string()))
        .bind(job.final_critique.as_ref().map(|v| v.to_string()))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<ResearchJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn set_description(
        &self,
        id: &JobId,
        description: &str,
        status: JobStatus,
    ) -> Result<()> {
        let now = self.time_provider.now_millis();
        sqlx::query("UPDATE jobs SET description = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(description)
            .bind(status.to_string())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let now = self.time_provider.now_millis();
        sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn set_report(
        &self,
        id: &JobId,
        report: &serde_json::Value,
        final_critique: Option<&serde_json::Value>,
        status: JobStatus,
    ) -> Result<()> {
        let now = self.time_provider.now_millis();
        // COALESCE keeps an existing critique when none is supplied.
        sqlx::query(
            r#"
            UPDATE jobs
            SET report = ?, final_critique = COALESCE(?, final_critique),
                status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(report.to_string())
        .bind(final_critique.map(|v| v.to_string()))
        .bind(status.to_string())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_status_if_not_in(
        &self,
        id: &JobId,
        not_in: &[JobStatus],
        to: JobStatus,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();

        // Statuses come from the enum's Display impl; safe to inline.
        let excluded: Vec<String> = not_in.iter().map(|s| format!("'{}'", s)).collect();
        let sql = format!(
            "UPDATE jobs SET status = ?, updated_at = ? WHERE id = ? AND status NOT IN ({})",
            excluded.join(", ")
        );

        let result = sqlx::query(&sql)
            .bind(to.to_string())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    idea: String,
    description: Option<String>,
    status: String,
    report: Option<String>,
    final_critique: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl JobRow {
    fn into_job(self) -> ResearchJob {
        let status = match self.status.as_str() {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "generating" => JobStatus::Generating,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed, // Default fallback
        };

        ResearchJob {
            id: self.id,
            idea: self.idea,
            description: self.description,
            status,
            report: self.report.and_then(|s| serde_json::from_str(&s).ok()),
            final_critique: self
                .final_critique
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_memory_pool, run_migrations};
    use scribe_core::port::time_provider::SystemTimeProvider;

    async fn setup_repo() -> SqliteJobRepository {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobRepository::new(pool, Arc::new(SystemTimeProvider))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup_repo().await;
        let job = ResearchJob::new("job-1", "Quantum battery research", 1000);

        repo.insert(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, "job-1");
        assert_eq!(found.idea, "Quantum battery research");
        assert_eq!(found.status, JobStatus::Pending);
        assert!(found.report.is_none());
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = setup_repo().await;
        assert!(repo.find_by_id(&"nope".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_description_moves_to_processing() {
        let repo = setup_repo().await;
        let job = ResearchJob::new("job-1", "idea text here", 1000);
        repo.insert(&job).await.unwrap();

        repo.set_description(&job.id, "enriched description", JobStatus::Processing)
            .await
            .unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.description.as_deref(), Some("enriched description"));
        assert_eq!(found.status, JobStatus::Processing);
        assert!(found.updated_at >= found.created_at);
    }

    #[tokio::test]
    async fn test_set_report_with_and_without_critique() {
        let repo = setup_repo().await;
        let job = ResearchJob::new("job-1", "idea text here", 1000);
        repo.insert(&job).await.unwrap();

        let report = serde_json::json!({ "summary": "s" });
        let critique = serde_json::json!({ "approved": true, "critique": "fine" });
        repo.set_report(&job.id, &report, Some(&critique), JobStatus::Completed)
            .await
            .unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Completed);
        assert_eq!(found.report.unwrap()["summary"], "s");
        assert_eq!(found.final_critique.as_ref().unwrap()["approved"], true);

        // A later write without critique keeps the stored one.
        repo.set_report(&job.id, &report, None, JobStatus::Completed)
            .await
            .unwrap();
        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert!(found.final_critique.is_some());
    }

    #[tokio::test]
    async fn test_generating_cas_wins_once() {
        let repo = setup_repo().await;
        let mut job = ResearchJob::new("job-1", "idea text here", 1000);
        job.status = JobStatus::Processing;
        repo.insert(&job).await.unwrap();

        let guard = [JobStatus::Generating, JobStatus::Completed];
        let first = repo
            .update_status_if_not_in(&job.id, &guard, JobStatus::Generating)
            .await
            .unwrap();
        let second = repo
            .update_status_if_not_in(&job.id, &guard, JobStatus::Generating)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Generating);
    }
}
