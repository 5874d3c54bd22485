// find_contradictions handler - soft-signal phase, web-search armed

use crate::application::agent::{self, personas, RunContext};
use crate::application::handlers::TaskPayload;
use crate::application::{json, PipelineDeps};
use crate::domain::{ContradictionReport, TaskStatus};
use crate::error::Result;
use tracing::{info, warn};

/// Hunt for evidence contradicting the findings. Advances with a null
/// report on agent or parse failure.
pub async fn run(deps: &PipelineDeps, payload: TaskPayload) -> Result<()> {
    let task = match deps.tasks.find_by_id(&payload.task_id).await? {
        Some(task) => task,
        None => {
            warn!(task_id = %payload.task_id, "Task not found");
            return Ok(());
        }
    };
    if task.status != TaskStatus::ContradictingStarted {
        info!(task_id = %task.id, status = %task.status, "Skipping stale contradiction dispatch");
        return Ok(());
    }

    info!(task_id = %task.id, job_id = %task.job_id, "Contradiction search started");

    let input = format!(
        "Task: {}\n\nFindings: {}",
        task.title,
        task.result.as_deref().unwrap_or("")
    );

    let ctx = RunContext {
        job_id: task.job_id.clone(),
    };

    let report =
        match agent::run_agent(deps, &personas::contradiction_seeker(), &input, &ctx).await {
            Ok(raw) => {
                let parsed = json::parse_json::<ContradictionReport>(&raw);
                if parsed.is_none() {
                    warn!(task_id = %task.id, "Contradiction output unparseable, storing null");
                }
                parsed.and_then(|report| serde_json::to_value(report).ok())
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Contradiction agent failed, storing null");
                None
            }
        };

    deps.tasks
        .complete_contradicting(&task.id, report.as_ref())
        .await?;

    deps.enqueue_supervisor(&task.job_id).await
}
