// Research Job Domain Model

use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job lifecycle state.
///
/// `Generating` guards the single-shot aggregation: the supervisor moves a
/// job into it with a compare-and-set, so aggregation runs at most once per
/// job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Generating,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl JobStatus {
    /// Terminal states: no handler writes to the job afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A research job: one client idea, enriched and broken down into tasks,
/// eventually aggregated into a structured report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchJob {
    pub id: JobId,
    /// Original user text (validated to >= 5 visible characters at the API).
    pub idea: String,
    /// Enriched expansion, populated by the enrich handler.
    pub description: Option<String>,
    pub status: JobStatus,
    /// Structured report `{summary, key_findings, details}` or the
    /// `{content, format: "plain_text"}` fallback; `{error}` on failure.
    pub report: Option<serde_json::Value>,
    /// Final critic output `{approved, critique, required_edits}`.
    pub final_critique: Option<serde_json::Value>,
    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms, mutated on every write
}

impl ResearchJob {
    /// Create a new pending job.
    ///
    /// ID and timestamp are injected (not generated) so tests stay
    /// deterministic.
    pub fn new(id: impl Into<String>, idea: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            idea: idea.into(),
            description: None,
            status: JobStatus::Pending,
            report: None,
            final_critique: None,
            created_at,
            updated_at: created_at,
        }
    }
}
