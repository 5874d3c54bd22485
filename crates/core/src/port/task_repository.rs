// Task Repository Port (Interface)
//
// The guarded mutators encode the edges of the task state machine: each one
// matches on the expected current status and reports via its bool return
// whether the row was actually moved. Redelivered handler messages observe
// `false` and no-op.

use crate::domain::{JobId, ResearchTask, TaskId, TaskStatus};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task
    async fn insert(&self, task: &ResearchTask) -> Result<()>;

    /// Find task by ID
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<ResearchTask>>;

    /// All tasks of a job, ordered by (created_at, id)
    async fn list_by_job(&self, job_id: &JobId) -> Result<Vec<ResearchTask>>;

    /// Approved tasks of a job, in the same deterministic order
    async fn list_approved(&self, job_id: &JobId) -> Result<Vec<ResearchTask>>;

    /// Compare-and-set on status. The supervisor's entry transitions
    /// (`PENDING -> HYPOTHESIZING_STARTED` etc.) go through here; exactly
    /// one of two racing supervisors wins.
    async fn update_status_if(&self, id: &TaskId, from: TaskStatus, to: TaskStatus)
        -> Result<bool>;

    /// `HYPOTHESIZING_STARTED -> HYPOTHESIZED`, storing the (possibly null)
    /// hypotheses payload.
    async fn complete_hypothesizing(
        &self,
        id: &TaskId,
        hypotheses: Option<&serde_json::Value>,
    ) -> Result<bool>;

    /// `RESEARCHING_STARTED | RESEARCHING_RETRY -> RESEARCHED`, storing the
    /// researcher's findings.
    async fn complete_research(&self, id: &TaskId, result: &str) -> Result<bool>;

    /// `SCORING_STARTED -> SCORED`, storing the (possibly null) rating.
    async fn complete_scoring(
        &self,
        id: &TaskId,
        evidence_rating: Option<&serde_json::Value>,
    ) -> Result<bool>;

    /// `CONTRADICTING_STARTED -> CONTRADICTED`, storing the (possibly null)
    /// contradiction report.
    async fn complete_contradicting(
        &self,
        id: &TaskId,
        contradictions: Option<&serde_json::Value>,
    ) -> Result<bool>;

    /// `REVIEW_STARTED -> APPROVED | REJECTED`. A rejection records the
    /// feedback and increments `rejection_count`.
    async fn complete_review(
        &self,
        id: &TaskId,
        approved: bool,
        feedback: Option<&str>,
    ) -> Result<bool>;

    /// `RESEARCHING_STARTED | RESEARCHING_RETRY -> REJECTED` on researcher
    /// failure, recording the error as feedback and counting the rejection.
    async fn mark_rejected(&self, id: &TaskId, feedback: &str) -> Result<bool>;

    /// `REJECTED -> APPROVED`: the supervisor's bounded-retry escape after
    /// repeated rejections.
    async fn force_approve(&self, id: &TaskId) -> Result<bool>;
}
