// Research Task Domain Model - the per-subquestion state machine

use serde::{Deserialize, Serialize};

/// Task ID (UUID v4)
pub type TaskId = String;

/// Task pipeline state.
///
/// `*Started` variants are in-progress sentinels: the supervisor sets them
/// with a compare-and-set before dispatching a handler, which doubles as a
/// coarse lock against double-dispatch. Handlers perform the completion
/// transition as their final commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    HypothesizingStarted,
    Hypothesized,
    ResearchingStarted,
    Researched,
    ScoringStarted,
    Scored,
    ContradictingStarted,
    Contradicted,
    ReviewStarted,
    Approved,
    Rejected,
    ResearchingRetry,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::HypothesizingStarted => "HYPOTHESIZING_STARTED",
            TaskStatus::Hypothesized => "HYPOTHESIZED",
            TaskStatus::ResearchingStarted => "RESEARCHING_STARTED",
            TaskStatus::Researched => "RESEARCHED",
            TaskStatus::ScoringStarted => "SCORING_STARTED",
            TaskStatus::Scored => "SCORED",
            TaskStatus::ContradictingStarted => "CONTRADICTING_STARTED",
            TaskStatus::Contradicted => "CONTRADICTED",
            TaskStatus::ReviewStarted => "REVIEW_STARTED",
            TaskStatus::Approved => "APPROVED",
            TaskStatus::Rejected => "REJECTED",
            TaskStatus::ResearchingRetry => "RESEARCHING_RETRY",
        };
        write!(f, "{}", s)
    }
}

impl TaskStatus {
    /// Sentinel states owned by a dispatched handler. The supervisor leaves
    /// these untouched.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TaskStatus::HypothesizingStarted
                | TaskStatus::ResearchingStarted
                | TaskStatus::ScoringStarted
                | TaskStatus::ContradictingStarted
                | TaskStatus::ReviewStarted
                | TaskStatus::ResearchingRetry
        )
    }

    /// Terminal success state.
    pub fn is_approved(&self) -> bool {
        matches!(self, TaskStatus::Approved)
    }

    /// States counted as "done" by the progress projector.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskStatus::Approved | TaskStatus::Rejected)
    }

    /// Whether `from -> to` is an edge of the task state machine.
    ///
    /// The only backward edge is `REJECTED -> RESEARCHING_RETRY` (plus the
    /// bounded-retry escape `REJECTED -> APPROVED` applied by the
    /// supervisor after repeated rejections).
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (from, to),
            (Pending, HypothesizingStarted)
                | (HypothesizingStarted, Hypothesized)
                | (Hypothesized, ResearchingStarted)
                | (ResearchingStarted, Researched)
                | (ResearchingStarted, Rejected)
                | (Researched, ScoringStarted)
                | (ScoringStarted, Scored)
                | (Scored, ContradictingStarted)
                | (ContradictingStarted, Contradicted)
                | (Contradicted, ReviewStarted)
                | (ReviewStarted, Approved)
                | (ReviewStarted, Rejected)
                | (Rejected, ResearchingRetry)
                | (Rejected, Approved)
                | (ResearchingRetry, Researched)
                | (ResearchingRetry, Rejected)
        )
    }
}

/// A single research subquestion within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchTask {
    pub id: TaskId,
    pub job_id: crate::domain::JobId,
    /// The researcher's assignment, human-readable.
    pub title: String,
    pub status: TaskStatus,
    /// Free-text findings written by the researcher.
    pub result: Option<String>,
    /// Critic feedback when rejected.
    pub feedback: Option<String>,
    pub hypotheses: Option<serde_json::Value>,
    pub evidence_rating: Option<serde_json::Value>,
    pub contradictions: Option<serde_json::Value>,
    /// Times this task has been rejected; bounds the research retry loop.
    pub rejection_count: i32,
    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms
}

impl ResearchTask {
    pub fn new(
        id: impl Into<String>,
        job_id: impl Into<String>,
        title: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            job_id: job_id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            result: None,
            feedback: None,
            hypotheses: None,
            evidence_rating: None,
            contradictions: None,
            rejection_count: 0,
            created_at,
            updated_at: created_at,
        }
    }
}
