// final_critique handler - last gate before the job completes
//
// The draft must survive no matter what: a critic failure or crash still
// writes the report and completes the job. A final-critic rejection does
// not loop back to the reporter; the critique is attached to the completed
// job instead.

use crate::application::agent::{self, personas, RunContext};
use crate::application::{json, rag, PipelineDeps};
use crate::domain::{FinalCritique, JobStatus};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalCritiquePayload {
    pub job_id: String,
    pub draft: serde_json::Value,
}

pub async fn run(deps: &PipelineDeps, payload: FinalCritiquePayload) -> Result<()> {
    info!(job_id = %payload.job_id, "Final critique started");

    let ctx = RunContext {
        job_id: payload.job_id.clone(),
    };

    let draft_text = serde_json::to_string_pretty(&payload.draft)
        .unwrap_or_else(|_| payload.draft.to_string());

    match agent::run_agent(deps, &personas::final_critic(), &draft_text, &ctx).await {
        Ok(raw) => {
            let critique = match json::parse_json::<FinalCritique>(&raw) {
                Some(critique) => critique,
                // Plain-text critic output is treated as an approval with
                // the text as the critique.
                None => FinalCritique {
                    approved: true,
                    critique: raw,
                    required_edits: Vec::new(),
                },
            };
            if !critique.approved {
                warn!(job_id = %payload.job_id, critique = %critique.critique, "Final critic rejected the report");
            }
            let critique_value = serde_json::to_value(&critique)?;
            deps.jobs
                .set_report(
                    &payload.job_id,
                    &payload.draft,
                    Some(&critique_value),
                    JobStatus::Completed,
                )
                .await?;
        }
        Err(e) => {
            // Preserve the report even when the critic crashes.
            error!(job_id = %payload.job_id, error = %e, "Final critic failed, completing without critique");
            deps.jobs
                .set_report(&payload.job_id, &payload.draft, None, JobStatus::Completed)
                .await?;
        }
    }

    info!(job_id = %payload.job_id, "Job completed");

    // Index the report for retrieval. The job is already completed; a
    // chunking failure must not flip it back. A redelivered message finds
    // the chunks already written and skips.
    match deps.chunks.count_by_job(&payload.job_id).await {
        Ok(0) => match rag::save_chunks(deps, &payload.job_id, &payload.draft).await {
            Ok(count) => {
                info!(job_id = %payload.job_id, chunk_count = count, "Report chunks saved")
            }
            Err(e) => warn!(job_id = %payload.job_id, error = %e, "Failed to save report chunks"),
        },
        Ok(_) => info!(job_id = %payload.job_id, "Report already chunked, skipping"),
        Err(e) => warn!(job_id = %payload.job_id, error = %e, "Chunk count check failed"),
    }

    Ok(())
}
