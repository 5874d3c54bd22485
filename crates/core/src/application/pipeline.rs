// Pipeline Context - explicit dependency bundle for handlers
//
// Every handler and the supervisor receive the same `PipelineDeps` value;
// per-invocation identifiers (job_id, task_id) travel in the queue payload,
// never in shared mutable state.

use crate::error::Result;
use crate::port::{
    AgentLogRepository, ChunkRepository, IdProvider, IdempotencyCache, JobRepository, LlmProvider,
    SearchClient, TaskRepository, TimeProvider, WorkQueue,
};
use std::sync::Arc;

/// Queue message kinds, one per handler.
pub mod kind {
    pub const ENRICH_IDEA: &str = "enrich_idea";
    pub const PLAN_RESEARCH: &str = "plan_research";
    pub const GENERATE_HYPOTHESES: &str = "generate_hypotheses";
    pub const PERFORM_RESEARCH: &str = "perform_research";
    pub const SCORE_EVIDENCE: &str = "score_evidence";
    pub const FIND_CONTRADICTIONS: &str = "find_contradictions";
    pub const REVIEW_TASK: &str = "review_task";
    pub const AGGREGATE_REPORT: &str = "aggregate_report";
    pub const FINAL_CRITIQUE: &str = "final_critique";
    pub const RUN_SUPERVISOR: &str = "run_supervisor";
}

/// Shared port bundle wired once at startup (composition root) and cloned
/// into every worker.
#[derive(Clone)]
pub struct PipelineDeps {
    pub jobs: Arc<dyn JobRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub chunks: Arc<dyn ChunkRepository>,
    pub agent_logs: Arc<dyn AgentLogRepository>,
    pub queue: Arc<dyn WorkQueue>,
    pub idempotency: Arc<dyn IdempotencyCache>,
    pub llm: Arc<dyn LlmProvider>,
    pub search: Arc<dyn SearchClient>,
    pub time: Arc<dyn TimeProvider>,
    pub ids: Arc<dyn IdProvider>,
}

impl PipelineDeps {
    /// Re-enter the supervisor for a job. Handlers call this as their last
    /// step; the queue is the transport of the state machine.
    pub async fn enqueue_supervisor(&self, job_id: &str) -> Result<()> {
        self.queue
            .enqueue(
                kind::RUN_SUPERVISOR,
                serde_json::json!({ "job_id": job_id }),
            )
            .await
    }
}

/// Kick off the pipeline for a freshly created job: enrich, then plan, then
/// the supervisor loop.
pub async fn start_research_chain(deps: &PipelineDeps, job_id: &str, idea: &str) -> Result<()> {
    tracing::info!(job_id = %job_id, "Starting research chain");
    deps.queue
        .enqueue(
            kind::ENRICH_IDEA,
            serde_json::json!({ "job_id": job_id, "idea": idea }),
        )
        .await
}
