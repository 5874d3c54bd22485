// generate_hypotheses handler - soft-signal phase

use crate::application::agent::{self, personas, RunContext};
use crate::application::handlers::TaskPayload;
use crate::application::{json, PipelineDeps};
use crate::domain::{HypothesisSet, TaskStatus};
use crate::error::Result;
use tracing::{info, warn};

/// Run the hypothesis agent over the task title. The pipeline never stalls
/// on this phase: agent failure and parse failure both advance the task
/// with a null payload.
pub async fn run(deps: &PipelineDeps, payload: TaskPayload) -> Result<()> {
    let task = match deps.tasks.find_by_id(&payload.task_id).await? {
        Some(task) => task,
        None => {
            warn!(task_id = %payload.task_id, "Task not found");
            return Ok(());
        }
    };
    if task.status != TaskStatus::HypothesizingStarted {
        // Redelivered message; the completion CAS would no-op anyway.
        info!(task_id = %task.id, status = %task.status, "Skipping stale hypothesize dispatch");
        return Ok(());
    }

    info!(task_id = %task.id, job_id = %task.job_id, "Hypothesizing started");

    let ctx = RunContext {
        job_id: task.job_id.clone(),
    };

    let hypotheses = match agent::run_agent(
        deps,
        &personas::hypothesis_generator(),
        &task.title,
        &ctx,
    )
    .await
    {
        Ok(raw) => {
            let parsed = json::parse_json::<HypothesisSet>(&raw);
            if parsed.is_none() {
                warn!(task_id = %task.id, "Hypothesis output unparseable, storing null");
            }
            parsed.and_then(|set| serde_json::to_value(set).ok())
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Hypothesis agent failed, storing null");
            None
        }
    };

    deps.tasks
        .complete_hypothesizing(&task.id, hypotheses.as_ref())
        .await?;

    deps.enqueue_supervisor(&task.job_id).await
}
