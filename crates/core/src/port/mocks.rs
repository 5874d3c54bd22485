// Mock and in-memory port implementations
//
// Used by core unit tests and by the integration-tests crate (which pairs
// the scripted LLM/search mocks with real storage adapters). Kept public
// for that reason.

use crate::domain::{
    cosine_distance, AgentLog, Chunk, JobId, JobStatus, ResearchJob, ResearchTask, TaskId,
    TaskStatus,
};
use crate::error::{AppError, Result};
use crate::port::{
    AgentLogRepository, ChatMessage, ChunkRepository, Completion, IdProvider, IdempotencyCache,
    JobRepository, LlmProvider, QueueMessage, SearchClient, SearchDepth, SearchResponse,
    TaskRepository, TimeProvider, ToolDefinition, WorkQueue,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

/// Fixed, manually advanced clock.
pub struct FixedTimeProvider {
    now: AtomicI64,
}

impl FixedTimeProvider {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Deterministic IDs: prefix-1, prefix-2, ...
pub struct SequentialIdProvider {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdProvider for SequentialIdProvider {
    fn generate_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

enum ScriptedResponse {
    Completion(Completion),
    Error(String),
}

struct Script {
    marker: String,
    responses: VecDeque<ScriptedResponse>,
}

/// LLM provider driven by a script table.
///
/// A script is matched when its marker occurs in any message of the
/// request (typically a distinctive fragment of the persona's system
/// prompt). Responses are consumed front-to-back; the last one is sticky
/// so repeated invocations (retries, supervisor re-entry) keep answering.
pub struct ScriptedLlmProvider {
    scripts: Mutex<Vec<Script>>,
    embed_failures: AtomicBool,
}

impl Default for ScriptedLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlmProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            embed_failures: AtomicBool::new(false),
        }
    }

    pub fn script_text(&self, marker: &str, text: &str) {
        self.push(
            marker,
            ScriptedResponse::Completion(Completion {
                content: text.to_string(),
                tool_calls: Vec::new(),
            }),
        );
    }

    pub fn script_completion(&self, marker: &str, completion: Completion) {
        self.push(marker, ScriptedResponse::Completion(completion));
    }

    pub fn script_error(&self, marker: &str, error: &str) {
        self.push(marker, ScriptedResponse::Error(error.to_string()));
    }

    /// Make subsequent embed calls fail.
    pub fn fail_embeddings(&self) {
        self.embed_failures.store(true, Ordering::SeqCst);
    }

    fn push(&self, marker: &str, response: ScriptedResponse) {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(script) = scripts.iter_mut().find(|s| s.marker == marker) {
            script.responses.push_back(response);
        } else {
            let mut responses = VecDeque::new();
            responses.push_back(response);
            scripts.push(Script {
                marker: marker.to_string(),
                responses,
            });
        }
    }

    /// Deterministic pseudo-embedding: unit vector derived from the text
    /// bytes.
    pub fn embedding_for(text: &str) -> Vec<f32> {
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            state ^= u64::from(byte);
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }
        let mut values = Vec::with_capacity(crate::domain::EMBEDDING_DIM);
        for _ in 0..crate::domain::EMBEDDING_DIM {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let unit = ((state >> 33) as f64 / f64::from(u32::MAX)) * 2.0 - 1.0;
            values.push(unit as f32);
        }
        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        values
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _max_tokens: u32,
    ) -> Result<Completion> {
        let mut scripts = self.scripts.lock().unwrap();
        for script in scripts.iter_mut() {
            if messages.iter().any(|m| m.content.contains(&script.marker)) {
                let response = if script.responses.len() > 1 {
                    script.responses.pop_front()
                } else {
                    // Sticky last response for repeat invocations.
                    script.responses.front().map(|r| match r {
                        ScriptedResponse::Completion(c) => {
                            ScriptedResponse::Completion(c.clone())
                        }
                        ScriptedResponse::Error(e) => ScriptedResponse::Error(e.clone()),
                    })
                };
                return match response {
                    Some(ScriptedResponse::Completion(completion)) => Ok(completion),
                    Some(ScriptedResponse::Error(error)) => Err(AppError::Llm(error)),
                    None => Err(AppError::Llm("script exhausted".to_string())),
                };
            }
        }
        Err(AppError::Llm(format!(
            "no scripted response for prompt: {}",
            messages
                .first()
                .map(|m| m.content.chars().take(60).collect::<String>())
                .unwrap_or_default()
        )))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.embed_failures.load(Ordering::SeqCst) {
            return Err(AppError::Llm("embedding unavailable".to_string()));
        }
        Ok(Self::embedding_for(text))
    }
}

/// Search client returning a canned response and recording queries.
pub struct StaticSearchClient {
    response: Mutex<SearchResponse>,
    queries: Mutex<Vec<String>>,
    failures: AtomicBool,
}

impl Default for StaticSearchClient {
    fn default() -> Self {
        Self::new(SearchResponse::default())
    }
}

impl StaticSearchClient {
    pub fn new(response: SearchResponse) -> Self {
        Self {
            response: Mutex::new(response),
            queries: Mutex::new(Vec::new()),
            failures: AtomicBool::new(false),
        }
    }

    pub fn set_response(&self, response: SearchResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fail_searches(&self) {
        self.failures.store(true, Ordering::SeqCst);
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for StaticSearchClient {
    async fn search(
        &self,
        query: &str,
        _depth: SearchDepth,
        _max_results: u32,
        _include_raw_content: bool,
    ) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failures.load(Ordering::SeqCst) {
            return Err(AppError::Search("search engine unavailable".to_string()));
        }
        Ok(self.response.lock().unwrap().clone())
    }
}

/// In-memory job store with CAS semantics matching the SQL adapter.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<JobId, ResearchJob>>,
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert(&self, job: &ResearchJob) -> Result<()> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<ResearchJob>> {
        Ok(self.jobs.lock().unwrap().get(id).cloned())
    }

    async fn set_description(
        &self,
        id: &JobId,
        description: &str,
        status: JobStatus,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
        job.description = Some(description.to_string());
        job.status = status;
        Ok(())
    }

    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
        job.status = status;
        Ok(())
    }

    async fn set_report(
        &self,
        id: &JobId,
        report: &serde_json::Value,
        final_critique: Option<&serde_json::Value>,
        status: JobStatus,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
        job.report = Some(report.clone());
        if let Some(critique) = final_critique {
            job.final_critique = Some(critique.clone());
        }
        job.status = status;
        Ok(())
    }

    async fn update_status_if_not_in(
        &self,
        id: &JobId,
        not_in: &[JobStatus],
        to: JobStatus,
    ) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = match jobs.get_mut(id) {
            Some(job) => job,
            None => return Ok(false),
        };
        if not_in.contains(&job.status) {
            return Ok(false);
        }
        job.status = to;
        Ok(true)
    }
}

/// In-memory task store with the same guarded mutators as the SQL adapter.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<TaskId, ResearchTask>>,
}

impl InMemoryTaskRepository {
    fn mutate_if<F>(&self, id: &TaskId, allowed: &[TaskStatus], mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut ResearchTask),
    {
        let mut tasks = self.tasks.lock().unwrap();
        let task = match tasks.get_mut(id) {
            Some(task) => task,
            None => return Ok(false),
        };
        if !allowed.contains(&task.status) {
            return Ok(false);
        }
        mutate(task);
        Ok(true)
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &ResearchTask) -> Result<()> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<ResearchTask>> {
        Ok(self.tasks.lock().unwrap().get(id).cloned())
    }

    async fn list_by_job(&self, job_id: &JobId) -> Result<Vec<ResearchTask>> {
        let mut tasks: Vec<ResearchTask> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| &t.job_id == job_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(tasks)
    }

    async fn list_approved(&self, job_id: &JobId) -> Result<Vec<ResearchTask>> {
        let tasks = self.list_by_job(job_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.status == TaskStatus::Approved)
            .collect())
    }

    async fn update_status_if(
        &self,
        id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool> {
        self.mutate_if(id, &[from], |task| task.status = to)
    }

    async fn complete_hypothesizing(
        &self,
        id: &TaskId,
        hypotheses: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let hypotheses = hypotheses.cloned();
        self.mutate_if(id, &[TaskStatus::HypothesizingStarted], |task| {
            task.hypotheses = hypotheses;
            task.status = TaskStatus::Hypothesized;
        })
    }

    async fn complete_research(&self, id: &TaskId, result: &str) -> Result<bool> {
        let result = result.to_string();
        self.mutate_if(
            id,
            &[TaskStatus::ResearchingStarted, TaskStatus::ResearchingRetry],
            |task| {
                task.result = Some(result);
                task.status = TaskStatus::Researched;
            },
        )
    }

    async fn complete_scoring(
        &self,
        id: &TaskId,
        evidence_rating: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let rating = evidence_rating.cloned();
        self.mutate_if(id, &[TaskStatus::ScoringStarted], |task| {
            task.evidence_rating = rating;
            task.status = TaskStatus::Scored;
        })
    }

    async fn complete_contradicting(
        &self,
        id: &TaskId,
        contradictions: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let contradictions = contradictions.cloned();
        self.mutate_if(id, &[TaskStatus::ContradictingStarted], |task| {
            task.contradictions = contradictions;
            task.status = TaskStatus::Contradicted;
        })
    }

    async fn complete_review(
        &self,
        id: &TaskId,
        approved: bool,
        feedback: Option<&str>,
    ) -> Result<bool> {
        let feedback = feedback.map(str::to_string);
        self.mutate_if(id, &[TaskStatus::ReviewStarted], |task| {
            if approved {
                task.status = TaskStatus::Approved;
            } else {
                task.status = TaskStatus::Rejected;
                task.feedback = feedback;
                task.rejection_count += 1;
            }
        })
    }

    async fn mark_rejected(&self, id: &TaskId, feedback: &str) -> Result<bool> {
        let feedback = feedback.to_string();
        self.mutate_if(
            id,
            &[TaskStatus::ResearchingStarted, TaskStatus::ResearchingRetry],
            |task| {
                task.status = TaskStatus::Rejected;
                task.feedback = Some(feedback);
                task.rejection_count += 1;
            },
        )
    }

    async fn force_approve(&self, id: &TaskId) -> Result<bool> {
        self.mutate_if(id, &[TaskStatus::Rejected], |task| {
            task.status = TaskStatus::Approved;
        })
    }
}

/// FIFO queue with a full enqueue history for assertions.
#[derive(Default)]
pub struct RecordingQueue {
    pending: Mutex<VecDeque<QueueMessage>>,
    history: Mutex<Vec<(String, serde_json::Value)>>,
    next_id: AtomicI64,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every enqueue ever made, in order.
    pub fn history(&self) -> Vec<(String, serde_json::Value)> {
        self.history.lock().unwrap().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn enqueue(&self, kind: &str, payload: serde_json::Value) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.history
            .lock()
            .unwrap()
            .push((kind.to_string(), payload.clone()));
        self.pending.lock().unwrap().push_back(QueueMessage {
            id,
            kind: kind.to_string(),
            payload,
            enqueued_at: 0,
        });
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueueMessage>> {
        Ok(self.pending.lock().unwrap().pop_front())
    }

    async fn ack(&self, _message_id: i64) -> Result<()> {
        Ok(())
    }

    async fn requeue_stale(&self, _cutoff_ms: i64) -> Result<u64> {
        Ok(0)
    }

    async fn depth(&self) -> Result<i64> {
        Ok(self.pending.lock().unwrap().len() as i64)
    }
}

/// In-memory chunk store ranking by cosine distance.
pub struct InMemoryChunkRepository {
    chunks: Mutex<Vec<Chunk>>,
    time_provider: std::sync::Arc<dyn TimeProvider>,
}

impl InMemoryChunkRepository {
    pub fn new(time_provider: std::sync::Arc<dyn TimeProvider>) -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
            time_provider,
        }
    }

    pub fn all(&self) -> Vec<Chunk> {
        self.chunks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn insert_many(&self, chunks: &[Chunk]) -> Result<()> {
        self.chunks.lock().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        max_age_days: Option<i64>,
    ) -> Result<Vec<Chunk>> {
        let now = self.time_provider.now_millis();
        let cutoff = max_age_days.map(|days| now - days * 24 * 60 * 60 * 1000);

        let mut candidates: Vec<(f32, Chunk)> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|chunk| cutoff.map_or(true, |cutoff| chunk.created_at >= cutoff))
            .map(|chunk| (cosine_distance(query_embedding, &chunk.embedding), chunk.clone()))
            .collect();
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| chunk)
            .collect())
    }

    async fn count_by_job(&self, job_id: &JobId) -> Result<i64> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.job_id == job_id)
            .count() as i64)
    }
}

/// Agent log sink retaining everything for assertions.
#[derive(Default)]
pub struct InMemoryAgentLogRepository {
    logs: Mutex<Vec<AgentLog>>,
}

impl InMemoryAgentLogRepository {
    pub fn all(&self) -> Vec<AgentLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentLogRepository for InMemoryAgentLogRepository {
    async fn insert(&self, log: &AgentLog) -> Result<()> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

/// A fully in-memory `PipelineDeps` wiring for unit tests, exposing the
/// concrete mocks for scripting and assertions.
pub struct TestHarness {
    pub deps: crate::application::PipelineDeps,
    pub jobs: std::sync::Arc<InMemoryJobRepository>,
    pub tasks: std::sync::Arc<InMemoryTaskRepository>,
    pub chunks: std::sync::Arc<InMemoryChunkRepository>,
    pub agent_logs: std::sync::Arc<InMemoryAgentLogRepository>,
    pub queue: std::sync::Arc<RecordingQueue>,
    pub llm: std::sync::Arc<ScriptedLlmProvider>,
    pub search: std::sync::Arc<StaticSearchClient>,
    pub time: std::sync::Arc<FixedTimeProvider>,
}

impl TestHarness {
    pub fn new(now: i64) -> Self {
        use std::sync::Arc;

        let time = Arc::new(FixedTimeProvider::new(now));
        let jobs = Arc::new(InMemoryJobRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let chunks = Arc::new(InMemoryChunkRepository::new(time.clone()));
        let agent_logs = Arc::new(InMemoryAgentLogRepository::default());
        let queue = Arc::new(RecordingQueue::new());
        let llm = Arc::new(ScriptedLlmProvider::new());
        let search = Arc::new(StaticSearchClient::default());
        let idempotency = Arc::new(InMemoryIdempotencyCache::new(time.clone()));

        let deps = crate::application::PipelineDeps {
            jobs: jobs.clone(),
            tasks: tasks.clone(),
            chunks: chunks.clone(),
            agent_logs: agent_logs.clone(),
            queue: queue.clone(),
            idempotency,
            llm: llm.clone(),
            search: search.clone(),
            time: time.clone(),
            ids: Arc::new(SequentialIdProvider::new("id")),
        };

        Self {
            deps,
            jobs,
            tasks,
            chunks,
            agent_logs,
            queue,
            llm,
            search,
            time,
        }
    }
}

/// TTL cache over the fixed clock.
pub struct InMemoryIdempotencyCache {
    entries: Mutex<HashMap<String, (String, i64)>>,
    time_provider: std::sync::Arc<dyn TimeProvider>,
}

impl InMemoryIdempotencyCache {
    pub fn new(time_provider: std::sync::Arc<dyn TimeProvider>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            time_provider,
        }
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryIdempotencyCache {
    async fn put(&self, key: &str, job_id: &str, ttl_ms: i64) -> Result<()> {
        let expires_at = self.time_provider.now_millis() + ttl_ms;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (job_id.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.time_provider.now_millis();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(job_id, _)| job_id.clone()))
    }
}
