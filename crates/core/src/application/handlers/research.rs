// perform_research handler - the tool-armed researcher

use crate::application::agent::{self, personas, RunContext};
use crate::application::handlers::TaskPayload;
use crate::application::PipelineDeps;
use crate::domain::TaskStatus;
use crate::error::Result;
use tracing::{error, info, warn};

/// Run the researcher agent on the task title, prepending critic feedback
/// (retry rounds) and hypotheses when present. Failure rejects the task
/// with a system-error feedback so the supervisor retries it.
pub async fn run(deps: &PipelineDeps, payload: TaskPayload) -> Result<()> {
    let task = match deps.tasks.find_by_id(&payload.task_id).await? {
        Some(task) => task,
        None => {
            warn!(task_id = %payload.task_id, "Task not found");
            return Ok(());
        }
    };
    if task.status != TaskStatus::ResearchingStarted && task.status != TaskStatus::ResearchingRetry
    {
        info!(task_id = %task.id, status = %task.status, "Skipping stale research dispatch");
        return Ok(());
    }

    info!(task_id = %task.id, job_id = %task.job_id, "Research started");

    let prompt = build_prompt(&task.title, task.feedback.as_deref(), task.hypotheses.as_ref());

    let ctx = RunContext {
        job_id: task.job_id.clone(),
    };

    match agent::run_agent(deps, &personas::researcher(), &prompt, &ctx).await {
        Ok(result) => {
            deps.tasks.complete_research(&task.id, &result).await?;
            info!(task_id = %task.id, "Research completed");
        }
        Err(e) => {
            error!(task_id = %task.id, error = %e, "Research failed");
            deps.tasks
                .mark_rejected(&task.id, &format!("System Error: {}", e))
                .await?;
        }
    }

    deps.enqueue_supervisor(&task.job_id).await
}

fn build_prompt(
    title: &str,
    feedback: Option<&str>,
    hypotheses: Option<&serde_json::Value>,
) -> String {
    let mut prompt = match feedback {
        Some(feedback) if !feedback.is_empty() => format!(
            "Task: {}\n\nPREVIOUS FEEDBACK (Must be addressed): {}\n\n\
             Please improve the research based on this feedback.",
            title, feedback
        ),
        _ => title.to_string(),
    };

    if let Some(hypotheses) = hypotheses {
        prompt.push_str(&format!("\n\nInitial hypotheses to test:\n{}", hypotheses));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_is_title_without_feedback() {
        assert_eq!(build_prompt("Find X", None, None), "Find X");
    }

    #[test]
    fn test_prompt_prepends_feedback() {
        let prompt = build_prompt("Find X", Some("more depth"), None);
        assert!(prompt.starts_with("Task: Find X"));
        assert!(prompt.contains("PREVIOUS FEEDBACK (Must be addressed): more depth"));
    }

    #[test]
    fn test_prompt_appends_hypotheses() {
        let hypotheses = json!({ "hypotheses": [{ "statement": "X holds" }] });
        let prompt = build_prompt("Find X", None, Some(&hypotheses));
        assert!(prompt.contains("Initial hypotheses to test:"));
        assert!(prompt.contains("X holds"));
    }

    #[test]
    fn test_empty_feedback_is_ignored() {
        assert_eq!(build_prompt("Find X", Some(""), None), "Find X");
    }
}
