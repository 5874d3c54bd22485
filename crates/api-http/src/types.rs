//! HTTP Request/Response Types

use scribe_core::application::progress::Progress;
use scribe_core::domain::{JobStatus, ResearchJob};
use serde::{Deserialize, Serialize};

/// POST /research body
#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub idea: String,
}

/// Client-visible job status snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress_percent: u8,
    pub current_phase: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /research/{job_id} response: status plus the payloads.
#[derive(Debug, Clone, Serialize)]
pub struct JobResultResponse {
    #[serde(flatten)]
    pub status: JobStatusResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub details: serde_json::Value,
}

/// `generating` is an internal guard state; clients see `processing`.
pub fn client_status(status: JobStatus) -> String {
    match status {
        JobStatus::Generating => JobStatus::Processing.to_string(),
        other => other.to_string(),
    }
}

impl JobStatusResponse {
    pub fn from_job(job: &ResearchJob, progress: Progress) -> Self {
        let error = if job.status == JobStatus::Failed {
            job.report
                .as_ref()
                .and_then(|r| r.get("error"))
                .and_then(|e| e.as_str())
                .map(str::to_string)
        } else {
            None
        };

        Self {
            job_id: job.id.clone(),
            status: client_status(job.status),
            progress_percent: progress.percent,
            current_phase: progress.phase.to_string(),
            created_at: job.created_at,
            updated_at: Some(job.updated_at),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::application::progress::Phase;

    #[test]
    fn test_generating_is_presented_as_processing() {
        assert_eq!(client_status(JobStatus::Generating), "processing");
        assert_eq!(client_status(JobStatus::Pending), "pending");
        assert_eq!(client_status(JobStatus::Completed), "completed");
    }

    #[test]
    fn test_failed_job_exposes_report_error() {
        let mut job = ResearchJob::new("j-1", "some idea text", 1000);
        job.status = JobStatus::Failed;
        job.report = Some(serde_json::json!({ "error": "aggregation broke" }));

        let response = JobStatusResponse::from_job(
            &job,
            Progress {
                percent: 0,
                phase: Phase::Failed,
            },
        );
        assert_eq!(response.error.as_deref(), Some("aggregation broke"));
        assert_eq!(response.status, "failed");
        assert_eq!(response.current_phase, "failed");
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let response = JobStatusResponse {
            job_id: "j-1".into(),
            status: "pending".into(),
            progress_percent: 0,
            current_phase: "queued".into(),
            created_at: 1000,
            updated_at: None,
            error: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("updated_at"));
        assert!(!json.contains("error"));
    }
}
