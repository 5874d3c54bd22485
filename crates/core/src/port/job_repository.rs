// Job Repository Port (Interface)

use crate::domain::{JobId, JobStatus, ResearchJob};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for research job persistence.
///
/// Every update mutates `updated_at`.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job
    async fn insert(&self, job: &ResearchJob) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<ResearchJob>>;

    /// Write the enriched description and move the job to the given status
    async fn set_description(
        &self,
        id: &JobId,
        description: &str,
        status: JobStatus,
    ) -> Result<()>;

    /// Unconditional status write
    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()>;

    /// Write report (and optionally the final critique) with a status
    async fn set_report(
        &self,
        id: &JobId,
        report: &serde_json::Value,
        final_critique: Option<&serde_json::Value>,
        status: JobStatus,
    ) -> Result<()>;

    /// Conditional status update: succeeds only when the current status is
    /// NOT one of `not_in`. Returns true when the row was updated.
    ///
    /// This is the serialisation point for single-shot aggregation
    /// (`processing -> generating`).
    async fn update_status_if_not_in(
        &self,
        id: &JobId,
        not_in: &[JobStatus],
        to: JobStatus,
    ) -> Result<bool>;
}
