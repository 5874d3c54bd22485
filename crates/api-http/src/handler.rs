//! Route Handlers
//!
//! Implements the business logic for each HTTP route. Handlers do short
//! storage writes and queue enqueues only; they never call the LLM.

use crate::error::to_http_error;
use crate::server::ApiState;
use crate::types::{
    ErrorResponse, HealthResponse, JobResultResponse, JobStatusResponse, ResearchRequest,
};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use scribe_core::application::progress::{self, Phase};
use scribe_core::application::{pipeline, PipelineDeps};
use scribe_core::domain::{ResearchJob, TaskStatus};
use scribe_core::error::AppError;
use scribe_core::port::IDEMPOTENCY_TTL_MS;
use serde_json::json;
use tracing::{info, warn};

/// Minimum visible (non-whitespace) characters in an idea.
const MIN_IDEA_LEN: usize = 5;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        details: json!({ "version": scribe_core::VERSION }),
    })
}

/// GET /ready - probes the backing services; 503 when degraded.
pub async fn ready(
    State(state): State<ApiState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = match state.deps.jobs.find_by_id(&"readiness-probe".to_string()).await {
        Ok(_) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {}", e),
    };
    let queue = match state.deps.queue.depth().await {
        Ok(_) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {}", e),
    };

    let degraded = database != "healthy" || queue != "healthy";
    let response = HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        details: json!({ "database": database, "queue": queue }),
    };

    if degraded {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    } else {
        Ok(Json(response))
    }
}

/// POST /research - create a job and kick off the pipeline.
pub async fn create_research(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<JobStatusResponse>, HandlerError> {
    if !state.rate_limiter.check() {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Rate limit exceeded. Please slow down.".to_string(),
                code: "THROTTLED".to_string(),
            }),
        ));
    }

    let visible_len = request.idea.chars().filter(|c| !c.is_whitespace()).count();
    if visible_len < MIN_IDEA_LEN {
        return Err(to_http_error(AppError::Validation(format!(
            "Idea must contain at least {} visible characters",
            MIN_IDEA_LEN
        ))));
    }

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // Consult the cache only when the client sent a key. A cache error is
    // a miss, never a request failure.
    if let Some(key) = &idempotency_key {
        match state.deps.idempotency.get(key).await {
            Ok(Some(job_id)) => {
                info!(job_id = %job_id, "Idempotency hit, returning existing job");
                return current_status(&state.deps, &job_id).await.map(Json);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Idempotency cache read failed, treating as miss"),
        }
    }

    let job_id = state.deps.ids.generate_id();
    let now = state.deps.time.now_millis();
    let job = ResearchJob::new(job_id.clone(), request.idea.clone(), now);

    state.deps.jobs.insert(&job).await.map_err(to_http_error)?;
    pipeline::start_research_chain(&state.deps, &job_id, &request.idea)
        .await
        .map_err(to_http_error)?;

    if let Some(key) = &idempotency_key {
        if let Err(e) = state
            .deps
            .idempotency
            .put(key, &job_id, IDEMPOTENCY_TTL_MS)
            .await
        {
            warn!(error = %e, "Idempotency cache write failed");
        }
    }

    info!(job_id = %job_id, "Research job created");

    Ok(Json(JobStatusResponse {
        job_id,
        status: job.status.to_string(),
        progress_percent: 0,
        current_phase: Phase::Queued.to_string(),
        created_at: now,
        updated_at: Some(now),
        error: None,
    }))
}

/// GET /research/{job_id}
pub async fn get_research(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResultResponse>, HandlerError> {
    let job = state
        .deps
        .jobs
        .find_by_id(&job_id)
        .await
        .map_err(to_http_error)?
        .ok_or_else(|| {
            to_http_error(AppError::NotFound(format!("Research job {} not found", job_id)))
        })?;

    let statuses = task_statuses(&state.deps, &job_id).await?;
    let progress = progress::project(job.status, &statuses);

    Ok(Json(JobResultResponse {
        status: JobStatusResponse::from_job(&job, progress),
        description: job.description.clone(),
        report: job.report.clone(),
    }))
}

async fn current_status(
    deps: &PipelineDeps,
    job_id: &str,
) -> Result<JobStatusResponse, HandlerError> {
    let job = deps
        .jobs
        .find_by_id(&job_id.to_string())
        .await
        .map_err(to_http_error)?
        .ok_or_else(|| {
            to_http_error(AppError::NotFound(format!("Research job {} not found", job_id)))
        })?;

    let statuses = task_statuses(deps, job_id).await?;
    let progress = progress::project(job.status, &statuses);
    Ok(JobStatusResponse::from_job(&job, progress))
}

async fn task_statuses(
    deps: &PipelineDeps,
    job_id: &str,
) -> Result<Vec<TaskStatus>, HandlerError> {
    Ok(deps
        .tasks
        .list_by_job(&job_id.to_string())
        .await
        .map_err(to_http_error)?
        .iter()
        .map(|t| t.status)
        .collect())
}
