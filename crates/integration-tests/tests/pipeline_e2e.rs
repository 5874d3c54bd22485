//! End-to-end pipeline scenarios over real SQLite adapters
//!
//! The LLM is a scripted mock keyed on persona instruction fragments; the
//! search engine is a canned client. Everything else (repositories, queue,
//! idempotency cache, supervisor, handlers, worker dispatch) is the real
//! implementation.

use scribe_core::application::progress::{self, Phase};
use scribe_core::application::worker::Worker;
use scribe_core::application::{pipeline, PipelineDeps};
use scribe_core::domain::{JobStatus, ResearchJob, TaskStatus, EMBEDDING_DIM};
use scribe_core::port::mocks::{
    FixedTimeProvider, ScriptedLlmProvider, SequentialIdProvider, StaticSearchClient,
};
use scribe_core::port::{JobRepository, SearchResponse, SearchResult, TaskRepository, TimeProvider};
use scribe_infra_sqlite::{
    create_memory_pool, run_migrations, SqliteAgentLogRepository, SqliteChunkRepository,
    SqliteIdempotencyCache, SqliteJobRepository, SqliteTaskRepository, SqliteWorkQueue,
};
use sqlx::SqlitePool;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000_000;

// Persona markers: distinctive fragments of each agent's instructions.
const ENRICHER: &str = "idea enrichment expert";
const PLANNER: &str = "research planner";
const HYPOTHESIZER: &str = "hypothesis generator";
const RESEARCHER: &str = "thorough research assistant";
const SCORER: &str = "evidence evaluation expert";
const CONTRADICTOR: &str = "contradiction seeker";
const CRITIC: &str = "quality assurance expert";
const REPORTER: &str = "technical research reporter";
const FINAL_CRITIC: &str = "final gatekeeper";

const ENRICHED_DESCRIPTION: &str =
    "An expanded, comprehensive description of the research topic covering the relevant \
     angles, context and open questions worth investigating.";

const STRUCTURED_REPORT: &str = r#"{
    "summary": "A comprehensive overview of the research results, long enough to be indexed as a retrieval chunk on its own.",
    "key_findings": ["The approach is viable and well supported by the gathered evidence."],
    "details": {
        "Viability": "An extensive section describing the viability analysis in enough depth that it clears the minimum chunk length used by the indexer."
    }
}"#;

struct Pipeline {
    deps: PipelineDeps,
    pool: SqlitePool,
    llm: Arc<ScriptedLlmProvider>,
    time: Arc<FixedTimeProvider>,
}

impl Pipeline {
    async fn new() -> Self {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let time = Arc::new(FixedTimeProvider::new(NOW));
        let llm = Arc::new(ScriptedLlmProvider::new());
        let search = Arc::new(StaticSearchClient::new(SearchResponse {
            answer: "a search answer".into(),
            results: vec![SearchResult {
                title: "Reference".into(),
                url: "https://example.com/reference".into(),
                content: "reference content".into(),
                score: Some(0.9),
            }],
        }));

        let deps = PipelineDeps {
            jobs: Arc::new(SqliteJobRepository::new(pool.clone(), time.clone())),
            tasks: Arc::new(SqliteTaskRepository::new(pool.clone(), time.clone())),
            chunks: Arc::new(SqliteChunkRepository::new(pool.clone(), time.clone())),
            agent_logs: Arc::new(SqliteAgentLogRepository::new(pool.clone())),
            queue: Arc::new(SqliteWorkQueue::new(pool.clone(), time.clone())),
            idempotency: Arc::new(SqliteIdempotencyCache::new(pool.clone(), time.clone())),
            llm: llm.clone(),
            search,
            time: time.clone(),
            ids: Arc::new(SequentialIdProvider::new("id")),
        };

        Self {
            deps,
            pool,
            llm,
            time,
        }
    }

    /// Script the personas every scenario shares. Planner, critic, reporter
    /// and final critic are scripted per test.
    fn script_common(&self) {
        self.llm.script_text(ENRICHER, ENRICHED_DESCRIPTION);
        self.llm.script_text(
            HYPOTHESIZER,
            r#"{"hypotheses": [{"statement": "The approach is viable", "confidence": "medium", "reasoning": "prior art exists"}]}"#,
        );
        self.llm.script_text(
            RESEARCHER,
            "Detailed findings for the subquestion, including concrete figures, steps and \
             configuration notes gathered from the available sources.",
        );
        self.llm.script_text(
            SCORER,
            r#"{"relevance_score": 8, "credibility_score": 7, "analysis": "solid sourcing", "weak_points": []}"#,
        );
        self.llm.script_text(
            CONTRADICTOR,
            r#"{"contradictions_found": false, "details": []}"#,
        );
    }

    fn script_tail(&self) {
        self.llm.script_text(REPORTER, STRUCTURED_REPORT);
        self.llm.script_text(
            FINAL_CRITIC,
            r#"{"approved": true, "critique": "well structured and sufficiently detailed", "required_edits": []}"#,
        );
    }

    /// Create a job through the same path the API uses and drain the queue.
    async fn run_job(&self, idea: &str) -> ResearchJob {
        let job_id = "job-under-test".to_string();
        let job = ResearchJob::new(job_id.clone(), idea, self.time.now_millis());
        self.deps.jobs.insert(&job).await.unwrap();
        pipeline::start_research_chain(&self.deps, &job_id, idea)
            .await
            .unwrap();

        self.drain().await;

        self.deps.jobs.find_by_id(&job_id).await.unwrap().unwrap()
    }

    /// Process messages until the queue is empty.
    async fn drain(&self) {
        let worker = Worker::new(self.deps.clone());
        let mut processed = 0;
        while worker.process_next_message().await.unwrap() {
            processed += 1;
            assert!(processed < 500, "queue did not drain");
        }
    }

    async fn chunk_rows(&self) -> Vec<(String, String)> {
        sqlx::query_as::<_, (String, String)>("SELECT content, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    async fn agent_log_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM agent_logs")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_happy_path_single_task() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline
        .llm
        .script_text(PLANNER, r#"["Investigate the single subquestion"]"#);
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "comprehensive"}"#);
    pipeline.script_tail();

    let job = pipeline.run_job("Test topic with enough length").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.description.as_deref(), Some(ENRICHED_DESCRIPTION));

    let report = job.report.expect("completed job must carry a report");
    assert!(!report["summary"].as_str().unwrap().is_empty());

    let critique = job.final_critique.expect("final critique must be recorded");
    assert_eq!(critique["approved"], true);

    let tasks = pipeline.deps.tasks.list_by_job(&job.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Investigate the single subquestion");
    assert_eq!(tasks[0].status, TaskStatus::Approved);
    assert!(tasks[0].hypotheses.is_some());
    assert!(tasks[0].evidence_rating.is_some());
    assert!(tasks[0].contradictions.is_some());

    // Progress projects to the terminal snapshot.
    let statuses: Vec<TaskStatus> = tasks.iter().map(|t| t.status).collect();
    let progress = progress::project(job.status, &statuses);
    assert_eq!(progress.percent, 100);
    assert_eq!(progress.phase, Phase::Reporting);

    // Chunks were written from the report, each above the length floor and
    // fully embedded.
    let chunks = pipeline.chunk_rows().await;
    assert!(!chunks.is_empty());
    for (content, embedding) in &chunks {
        assert!(content.chars().count() >= 50, "short chunk: {}", content);
        let embedding: Vec<f32> = serde_json::from_str(embedding).unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);
    }

    // Every agent turn was observed.
    assert!(pipeline.agent_log_count().await > 0);
}

#[tokio::test]
async fn test_rejection_retry_then_approval() {
    let pipeline = Pipeline::new().await;
    pipeline.llm.script_text(ENRICHER, ENRICHED_DESCRIPTION);
    pipeline
        .llm
        .script_text(PLANNER, r#"["Investigate the single subquestion"]"#);
    pipeline.llm.script_text(HYPOTHESIZER, r#"{"hypotheses": []}"#);
    // Round one findings, then the improved retry.
    pipeline.llm.script_text(
        RESEARCHER,
        "Initial findings, thin on detail but long enough to be stored as a result.",
    );
    pipeline.llm.script_text(
        RESEARCHER,
        "Improved findings addressing the reviewer's request for additional depth and \
         supporting data points.",
    );
    pipeline.llm.script_text(
        SCORER,
        r#"{"relevance_score": 6, "credibility_score": 6, "analysis": "ok", "weak_points": []}"#,
    );
    pipeline.llm.script_text(
        CONTRADICTOR,
        r#"{"contradictions_found": false, "details": []}"#,
    );
    // First review rejects, second approves.
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": false, "feedback": "more depth"}"#);
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "now sufficient"}"#);
    pipeline.script_tail();

    let job = pipeline.run_job("Test topic with enough length").await;

    assert_eq!(job.status, JobStatus::Completed);

    let tasks = pipeline.deps.tasks.list_by_job(&job.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];

    assert_eq!(task.status, TaskStatus::Approved);
    assert_eq!(task.rejection_count, 1);
    // The rejection feedback was recorded and the retry produced the
    // improved findings.
    assert_eq!(task.feedback.as_deref(), Some("more depth"));
    assert!(task
        .result
        .as_ref()
        .unwrap()
        .starts_with("Improved findings"));
}

#[tokio::test]
async fn test_planner_parse_fallback_creates_single_task() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline.llm.script_text(PLANNER, "Not JSON");
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "ok"}"#);
    pipeline.script_tail();

    let job = pipeline.run_job("Test topic with enough length").await;

    // Exactly one task, titled with the full enriched description.
    let tasks = pipeline.deps.tasks.list_by_job(&job.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, ENRICHED_DESCRIPTION);

    // And the pipeline proceeded normally.
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(tasks[0].status, TaskStatus::Approved);
}

#[tokio::test]
async fn test_aggregation_failure_fails_the_job_without_chunks() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline
        .llm
        .script_text(PLANNER, r#"["Investigate the single subquestion"]"#);
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "ok"}"#);
    // The reporter blows up during aggregation.
    pipeline.llm.script_error(REPORTER, "model capacity exceeded");

    let job = pipeline.run_job("Test topic with enough length").await;

    assert_eq!(job.status, JobStatus::Failed);
    let report = job.report.expect("failed job carries an error report");
    assert!(report["error"]
        .as_str()
        .unwrap()
        .contains("model capacity exceeded"));

    // No chunks were written.
    assert!(pipeline.chunk_rows().await.is_empty());

    // Client-visible projection: failed, zero progress.
    let progress = progress::project(job.status, &[TaskStatus::Approved]);
    assert_eq!(progress.percent, 0);
    assert_eq!(progress.phase, Phase::Failed);
}

#[tokio::test]
async fn test_plain_text_reporter_output_falls_back() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline
        .llm
        .script_text(PLANNER, r#"["Investigate the single subquestion"]"#);
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "ok"}"#);
    pipeline.llm.script_text(
        REPORTER,
        "A free-form narrative report that is not valid JSON but still long enough to be \
         indexed as a chunk by the retrieval layer.",
    );
    pipeline.llm.script_text(
        FINAL_CRITIC,
        r#"{"approved": true, "critique": "fine", "required_edits": []}"#,
    );

    let job = pipeline.run_job("Test topic with enough length").await;

    assert_eq!(job.status, JobStatus::Completed);
    let report = job.report.unwrap();
    assert_eq!(report["format"], "plain_text");
    assert!(report["content"].as_str().unwrap().contains("free-form"));

    // The plain-text report still becomes a chunk.
    assert!(!pipeline.chunk_rows().await.is_empty());
}

#[tokio::test]
async fn test_supervisor_reentry_is_idempotent_at_rest() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline
        .llm
        .script_text(PLANNER, r#"["Investigate the single subquestion"]"#);
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "ok"}"#);
    pipeline.script_tail();

    let job = pipeline.run_job("Test topic with enough length").await;
    assert_eq!(job.status, JobStatus::Completed);
    let chunk_count_after_completion = pipeline.chunk_rows().await.len();

    // Kick the supervisor twice on the settled job: nothing may change.
    pipeline.deps.enqueue_supervisor(&job.id).await.unwrap();
    pipeline.deps.enqueue_supervisor(&job.id).await.unwrap();
    pipeline.drain().await;

    let reloaded = pipeline
        .deps
        .jobs
        .find_by_id(&job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, JobStatus::Completed);
    assert_eq!(pipeline.deps.queue.depth().await.unwrap(), 0);
    assert_eq!(pipeline.chunk_rows().await.len(), chunk_count_after_completion);
}

#[tokio::test]
async fn test_multi_task_job_aggregates_all_approved_findings() {
    let pipeline = Pipeline::new().await;
    pipeline.script_common();
    pipeline.llm.script_text(
        PLANNER,
        r#"["First subquestion to investigate", "Second subquestion to investigate"]"#,
    );
    pipeline
        .llm
        .script_text(CRITIC, r#"{"approved": true, "feedback": "ok"}"#);
    pipeline.script_tail();

    let job = pipeline.run_job("Test topic with enough length").await;

    assert_eq!(job.status, JobStatus::Completed);
    let tasks = pipeline.deps.tasks.list_by_job(&job.id).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Approved));
}
