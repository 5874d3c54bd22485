// enrich_idea handler - expand the raw idea into a research description

use crate::application::agent::{self, personas, RunContext};
use crate::application::pipeline::{kind, PipelineDeps};
use crate::domain::JobStatus;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichPayload {
    pub job_id: String,
    pub idea: String,
}

/// Run the enricher agent; on success write the description, mark the job
/// `processing` and chain into planning. There is no task row yet to absorb
/// a failure, so an enrich failure fails the job.
pub async fn run(deps: &PipelineDeps, payload: EnrichPayload) -> Result<()> {
    let job = match deps.jobs.find_by_id(&payload.job_id).await? {
        Some(job) => job,
        None => {
            warn!(job_id = %payload.job_id, "Job not found");
            return Ok(());
        }
    };
    if job.status != JobStatus::Pending {
        // Redelivered message; the job has already been enriched.
        info!(job_id = %job.id, status = %job.status, "Skipping stale enrich dispatch");
        return Ok(());
    }

    info!(job_id = %payload.job_id, "Enrich started");

    let ctx = RunContext {
        job_id: payload.job_id.clone(),
    };

    match agent::run_agent(deps, &personas::enricher(), &payload.idea, &ctx).await {
        Ok(description) => {
            deps.jobs
                .set_description(&payload.job_id, &description, JobStatus::Processing)
                .await?;
            deps.queue
                .enqueue(
                    kind::PLAN_RESEARCH,
                    json!({ "job_id": payload.job_id, "description": description }),
                )
                .await?;
            info!(job_id = %payload.job_id, "Enrich completed");
        }
        Err(e) => {
            error!(job_id = %payload.job_id, error = %e, "Enrich failed");
            deps.jobs
                .set_report(
                    &payload.job_id,
                    &json!({ "error": e.to_string() }),
                    None,
                    JobStatus::Failed,
                )
                .await?;
        }
    }

    Ok(())
}
