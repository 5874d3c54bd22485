// plan_research handler - break the description into research tasks

use crate::application::agent::{self, personas, RunContext};
use crate::application::{json, PipelineDeps};
use crate::domain::ResearchTask;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanPayload {
    pub job_id: String,
    pub description: String,
}

/// Run the planner agent and create one PENDING task per planned title.
/// Planner output that fails to parse (or a planner failure outright)
/// produces exactly one task titled with the full description.
pub async fn run(deps: &PipelineDeps, payload: PlanPayload) -> Result<()> {
    // Redelivery guard: a job is planned exactly once.
    let existing = deps.tasks.list_by_job(&payload.job_id).await?;
    if !existing.is_empty() {
        info!(job_id = %payload.job_id, "Job already planned, skipping");
        return deps.enqueue_supervisor(&payload.job_id).await;
    }

    info!(job_id = %payload.job_id, "Planning started");

    let ctx = RunContext {
        job_id: payload.job_id.clone(),
    };

    let titles = match agent::run_agent(deps, &personas::planner(), &payload.description, &ctx)
        .await
    {
        Ok(raw) => match json::parse_plan(&raw) {
            Some(titles) => titles,
            None => {
                warn!(job_id = %payload.job_id, "Planner output unparseable, using fallback plan");
                vec![payload.description.clone()]
            }
        },
        Err(e) => {
            warn!(job_id = %payload.job_id, error = %e, "Planner failed, using fallback plan");
            vec![payload.description.clone()]
        }
    };

    for title in &titles {
        let task = ResearchTask::new(
            deps.ids.generate_id(),
            payload.job_id.clone(),
            title.clone(),
            deps.time.now_millis(),
        );
        deps.tasks.insert(&task).await?;
    }

    info!(job_id = %payload.job_id, task_count = titles.len(), "Planning completed");

    deps.enqueue_supervisor(&payload.job_id).await
}
