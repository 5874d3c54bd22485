// Supervisor Dispatcher
//
// The dependency-free scheduler that advances every task of a job by one
// state transition and fans the work out to the queue. The status CAS is
// the serialisation point: concurrent supervisor runs for the same job race
// on each transition, exactly one wins and enqueues, the loser observes the
// sentinel and skips. Invoking the supervisor on a stable job enqueues
// nothing.

use crate::application::pipeline::{kind, PipelineDeps};
use crate::domain::{JobStatus, TaskStatus};
use crate::error::Result;
use serde_json::json;
use tracing::{info, warn};

/// After this many rejections a task is force-approved instead of being
/// sent back to research, bounding the retry loop.
pub const MAX_TASK_REJECTIONS: i32 = 3;

/// Advance every task of the job by one transition; trigger aggregation
/// when the whole set is approved.
pub async fn run_supervisor(deps: &PipelineDeps, job_id: &str) -> Result<()> {
    let tasks = deps.tasks.list_by_job(&job_id.to_string()).await?;

    let mut all_approved = true;

    for task in &tasks {
        match task.status {
            TaskStatus::Pending => {
                all_approved = false;
                dispatch(
                    deps,
                    &task.id,
                    TaskStatus::Pending,
                    TaskStatus::HypothesizingStarted,
                    kind::GENERATE_HYPOTHESES,
                )
                .await?;
            }
            TaskStatus::Hypothesized => {
                all_approved = false;
                dispatch(
                    deps,
                    &task.id,
                    TaskStatus::Hypothesized,
                    TaskStatus::ResearchingStarted,
                    kind::PERFORM_RESEARCH,
                )
                .await?;
            }
            TaskStatus::Researched => {
                all_approved = false;
                dispatch(
                    deps,
                    &task.id,
                    TaskStatus::Researched,
                    TaskStatus::ScoringStarted,
                    kind::SCORE_EVIDENCE,
                )
                .await?;
            }
            TaskStatus::Scored => {
                all_approved = false;
                dispatch(
                    deps,
                    &task.id,
                    TaskStatus::Scored,
                    TaskStatus::ContradictingStarted,
                    kind::FIND_CONTRADICTIONS,
                )
                .await?;
            }
            TaskStatus::Contradicted => {
                all_approved = false;
                dispatch(
                    deps,
                    &task.id,
                    TaskStatus::Contradicted,
                    TaskStatus::ReviewStarted,
                    kind::REVIEW_TASK,
                )
                .await?;
            }
            TaskStatus::Rejected => {
                if task.rejection_count >= MAX_TASK_REJECTIONS {
                    // Bounded retry: give up on the critic loop and accept
                    // the latest findings.
                    if deps.tasks.force_approve(&task.id).await? {
                        warn!(
                            task_id = %task.id,
                            rejection_count = task.rejection_count,
                            "Task force-approved after repeated rejections"
                        );
                        // Now approved; contributes to all_approved as-is.
                    } else {
                        all_approved = false;
                    }
                } else {
                    all_approved = false;
                    if deps
                        .tasks
                        .update_status_if(
                            &task.id,
                            TaskStatus::Rejected,
                            TaskStatus::ResearchingRetry,
                        )
                        .await?
                    {
                        deps.queue
                            .enqueue(kind::PERFORM_RESEARCH, json!({ "task_id": task.id }))
                            .await?;
                    }
                }
            }
            status if status.is_in_progress() => {
                // Owned by a dispatched handler; leave untouched.
                all_approved = false;
            }
            TaskStatus::Approved => {}
            other => {
                warn!(task_id = %task.id, status = %other, "Unexpected task status");
                all_approved = false;
            }
        }
    }

    if all_approved && !tasks.is_empty() {
        // Single-shot aggregation guard: exactly one supervisor run wins
        // the processing -> generating transition per job lifecycle.
        let won = deps
            .jobs
            .update_status_if_not_in(
                &job_id.to_string(),
                &[JobStatus::Generating, JobStatus::Completed],
                JobStatus::Generating,
            )
            .await?;
        if won {
            info!(job_id = %job_id, "All tasks approved, triggering aggregation");
            deps.queue
                .enqueue(kind::AGGREGATE_REPORT, json!({ "job_id": job_id }))
                .await?;
        }
    }

    Ok(())
}

/// CAS the task into its in-progress sentinel and, on success, enqueue the
/// matching handler. A lost race means another supervisor already
/// dispatched this phase.
async fn dispatch(
    deps: &PipelineDeps,
    task_id: &str,
    from: TaskStatus,
    to: TaskStatus,
    handler_kind: &str,
) -> Result<()> {
    if deps
        .tasks
        .update_status_if(&task_id.to_string(), from, to)
        .await?
    {
        deps.queue
            .enqueue(handler_kind, json!({ "task_id": task_id }))
            .await?;
    }
    Ok(())
}
