// review_task handler - the critic gate

use crate::application::agent::{self, personas, RunContext};
use crate::application::handlers::TaskPayload;
use crate::application::{json, PipelineDeps};
use crate::domain::{CriticVerdict, TaskStatus};
use crate::error::Result;
use tracing::{info, warn};

/// Run the critic over (title, result, contradictions). The verdict decides
/// APPROVED vs REJECTED; anything that prevents a verdict rejects the task
/// so the research retry loop gets another chance.
pub async fn run(deps: &PipelineDeps, payload: TaskPayload) -> Result<()> {
    let task = match deps.tasks.find_by_id(&payload.task_id).await? {
        Some(task) => task,
        None => {
            warn!(task_id = %payload.task_id, "Task not found");
            return Ok(());
        }
    };
    if task.status != TaskStatus::ReviewStarted {
        info!(task_id = %task.id, status = %task.status, "Skipping stale review dispatch");
        return Ok(());
    }

    info!(task_id = %task.id, job_id = %task.job_id, "Review started");

    let mut input = format!(
        "Task: {}\n\nResult: {}",
        task.title,
        task.result.as_deref().unwrap_or("")
    );
    if let Some(contradictions) = &task.contradictions {
        input.push_str(&format!("\n\nContradiction analysis: {}", contradictions));
    }

    let ctx = RunContext {
        job_id: task.job_id.clone(),
    };

    match agent::run_agent(deps, &personas::critic(), &input, &ctx).await {
        Ok(raw) => match json::parse_json::<CriticVerdict>(&raw) {
            Some(verdict) => {
                if verdict.approved {
                    deps.tasks.complete_review(&task.id, true, None).await?;
                    info!(task_id = %task.id, "Task approved");
                } else {
                    deps.tasks
                        .complete_review(&task.id, false, Some(&verdict.feedback))
                        .await?;
                    info!(task_id = %task.id, feedback = %verdict.feedback, "Task rejected");
                }
            }
            None => {
                warn!(task_id = %task.id, "Critic output unparseable");
                deps.tasks
                    .complete_review(
                        &task.id,
                        false,
                        Some(&format!("Parse Error: critic returned invalid JSON: {}", raw)),
                    )
                    .await?;
            }
        },
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Critic failed");
            deps.tasks
                .complete_review(
                    &task.id,
                    false,
                    Some(&format!("System Error in Review: {}", e)),
                )
                .await?;
        }
    }

    deps.enqueue_supervisor(&task.job_id).await
}
