// aggregate_report handler - fold approved findings into one draft
//
// Runs at most once per job lifecycle: the supervisor's
// processing -> generating CAS is the admission ticket. An aggregation
// failure fails the job; it is never retried automatically.

use crate::application::agent::{self, personas, RunContext};
use crate::application::pipeline::kind;
use crate::application::{json, PipelineDeps};
use crate::domain::{JobStatus, ResearchTask};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregatePayload {
    pub job_id: String,
}

pub async fn run(deps: &PipelineDeps, payload: AggregatePayload) -> Result<()> {
    // Only a job the supervisor moved into `generating` may aggregate; a
    // redelivered message observes a terminal status and no-ops.
    let job = match deps.jobs.find_by_id(&payload.job_id).await? {
        Some(job) => job,
        None => {
            warn!(job_id = %payload.job_id, "Job not found");
            return Ok(());
        }
    };
    if job.status != JobStatus::Generating {
        info!(job_id = %job.id, status = %job.status, "Skipping stale aggregation dispatch");
        return Ok(());
    }

    info!(job_id = %payload.job_id, "Aggregation started");

    match aggregate(deps, &payload.job_id).await {
        Ok(draft) => {
            deps.queue
                .enqueue(
                    kind::FINAL_CRITIQUE,
                    json!({ "job_id": payload.job_id, "draft": draft }),
                )
                .await?;
            info!(job_id = %payload.job_id, "Aggregation completed, final critique queued");
        }
        Err(e) => {
            error!(job_id = %payload.job_id, error = %e, "Aggregation failed");
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

async fn aggregate(deps: &PipelineDeps, job_id: &str) -> Result<serde_json::Value> {
    // Only APPROVED tasks contribute; the repository returns them in
    // deterministic (created_at, id) order.
    let tasks = deps.tasks.list_approved(&job_id.to_string()).await?;

    let context = build_context(&tasks);

    let ctx = RunContext {
        job_id: job_id.to_string(),
    };
    let raw = agent::run_agent(deps, &personas::reporter(), &context, &ctx).await?;

    Ok(json::parse_report_draft(&raw).to_value())
}

fn build_context(tasks: &[ResearchTask]) -> String {
    let sections: Vec<String> = tasks
        .iter()
        .map(|task| {
            let mut section = format!("## Task: {}", task.title);
            if let Some(hypotheses) = &task.hypotheses {
                section.push_str(&format!("\nHypotheses: {}", hypotheses));
            }
            section.push_str(&format!(
                "\nFindings: {}",
                task.result.as_deref().unwrap_or("")
            ));
            if let Some(rating) = &task.evidence_rating {
                section.push_str(&format!("\nEvidence rating: {}", rating));
            }
            if let Some(contradictions) = &task.contradictions {
                section.push_str(&format!("\nContradictions: {}", contradictions));
            }
            section
        })
        .collect();

    sections.join("\n\n")
}
