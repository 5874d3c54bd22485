// score_evidence handler - soft-signal phase

use crate::application::agent::{self, personas, RunContext};
use crate::application::handlers::TaskPayload;
use crate::application::{json, PipelineDeps};
use crate::domain::{EvidenceRating, TaskStatus};
use crate::error::Result;
use tracing::{info, warn};

/// Score the researcher's findings. Advances with a null rating on agent or
/// parse failure.
pub async fn run(deps: &PipelineDeps, payload: TaskPayload) -> Result<()> {
    let task = match deps.tasks.find_by_id(&payload.task_id).await? {
        Some(task) => task,
        None => {
            warn!(task_id = %payload.task_id, "Task not found");
            return Ok(());
        }
    };
    if task.status != TaskStatus::ScoringStarted {
        info!(task_id = %task.id, status = %task.status, "Skipping stale scoring dispatch");
        return Ok(());
    }

    info!(task_id = %task.id, job_id = %task.job_id, "Evidence scoring started");

    let input = format!(
        "Task: {}\n\nFindings: {}",
        task.title,
        task.result.as_deref().unwrap_or("")
    );

    let ctx = RunContext {
        job_id: task.job_id.clone(),
    };

    let rating = match agent::run_agent(deps, &personas::evidence_scorer(), &input, &ctx).await {
        Ok(raw) => {
            let parsed = json::parse_json::<EvidenceRating>(&raw);
            if parsed.is_none() {
                warn!(task_id = %task.id, "Evidence output unparseable, storing null");
            }
            parsed.and_then(|rating| serde_json::to_value(rating).ok())
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Evidence agent failed, storing null");
            None
        }
    };

    deps.tasks.complete_scoring(&task.id, rating.as_ref()).await?;

    deps.enqueue_supervisor(&task.job_id).await
}
