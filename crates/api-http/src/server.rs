//! HTTP Server
//!
//! Router assembly and listener. Auth is layered onto the research routes
//! only; health endpoints are never gated.

use crate::auth::{self, AuthConfig};
use crate::handler;
use crate::rate_limiter::RateLimiter;
use axum::routing::{get, post};
use axum::{middleware, Router};
use scribe_core::application::PipelineDeps;
use std::sync::Arc;
use tracing::info;

const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8000;

/// Server Configuration
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SCRIBE_HTTP_HOST")
                .unwrap_or_else(|_| DEFAULT_HTTP_HOST.to_string()),
            port: std::env::var("SCRIBE_HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub deps: PipelineDeps,
    pub auth: AuthConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn new(deps: PipelineDeps, auth: AuthConfig) -> Self {
        // Default: 200 burst, 100 req/sec (configurable via env)
        let max_burst: u32 = std::env::var("SCRIBE_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);
        let rate_per_sec: u32 = std::env::var("SCRIBE_RATE_LIMIT_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            deps,
            auth,
            rate_limiter: Arc::new(RateLimiter::new(max_burst, rate_per_sec)),
        }
    }
}

/// Assemble the application router.
pub fn build_router(state: ApiState) -> Router {
    let research_routes = Router::new()
        .route("/research", post(handler::create_research))
        .route("/research/:job_id", get(handler::get_research))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handler::health))
        .route("/ready", get(handler::ready))
        .merge(research_routes)
        .with_state(state)
}

/// HTTP server wrapper
pub struct ApiServer {
    config: ApiServerConfig,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until the process exits.
    pub async fn start(self) -> Result<(), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

        let router = build_router(self.state);

        axum::serve(listener, router)
            .await
            .map_err(|e| format!("HTTP server error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use scribe_core::domain::{JobStatus, ResearchJob, ResearchTask, TaskStatus};
    use scribe_core::port::mocks::TestHarness;
    use scribe_core::port::{JobRepository, TaskRepository};
    use tower::util::ServiceExt;

    fn router_with(harness: &TestHarness, auth: AuthConfig) -> Router {
        build_router(ApiState::new(harness.deps.clone(), auth))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_research(body: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/research")
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open_and_versioned() {
        let harness = TestHarness::new(1000);
        let router = router_with(
            &harness,
            AuthConfig {
                enabled: true,
                secret: "s3cret".into(),
            },
        );

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["details"]["version"].is_string());
    }

    #[tokio::test]
    async fn test_create_research_enqueues_the_chain() {
        let harness = TestHarness::new(1000);
        let router = router_with(&harness, AuthConfig::disabled());

        let response = router
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress_percent"], 0);
        assert_eq!(json["current_phase"], "queued");

        let job_id = json["job_id"].as_str().unwrap().to_string();
        let job = harness.jobs.find_by_id(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        let history = harness.queue.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0, "enrich_idea");
        assert_eq!(history[0].1["job_id"], job_id.as_str());
    }

    #[tokio::test]
    async fn test_short_idea_is_rejected_with_422() {
        let harness = TestHarness::new(1000);
        let router = router_with(&harness, AuthConfig::disabled());

        let response = router
            .oneshot(post_research(r#"{"idea": "hi  "}"#, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(harness.queue.history().is_empty());
    }

    #[tokio::test]
    async fn test_idempotency_replay_returns_same_job() {
        let harness = TestHarness::new(1000);
        let router = router_with(&harness, AuthConfig::disabled());

        let first = router
            .clone()
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[("Idempotency-Key", "abc")],
            ))
            .await
            .unwrap();
        let first_id = body_json(first).await["job_id"].as_str().unwrap().to_string();

        let second = router
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[("Idempotency-Key", "abc")],
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second_id = body_json(second).await["job_id"].as_str().unwrap().to_string();

        assert_eq!(first_id, second_id);
        // Only the first request enqueued work.
        assert_eq!(harness.queue.history().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_404() {
        let harness = TestHarness::new(1000);
        let router = router_with(&harness, AuthConfig::disabled());

        let response = router
            .oneshot(Request::get("/research/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_projects_progress_from_tasks() {
        let harness = TestHarness::new(1000);

        let mut job = ResearchJob::new("job-1", "some idea text", 1000);
        job.status = JobStatus::Processing;
        harness.jobs.insert(&job).await.unwrap();

        let mut done = ResearchTask::new("t-1", "job-1", "Done", 1000);
        done.status = TaskStatus::Approved;
        harness.tasks.insert(&done).await.unwrap();
        let open = ResearchTask::new("t-2", "job-1", "Open", 2000);
        harness.tasks.insert(&open).await.unwrap();

        let router = router_with(&harness, AuthConfig::disabled());
        let response = router
            .oneshot(Request::get("/research/job-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress_percent"], 55);
        assert_eq!(json["current_phase"], "researching");
    }

    #[tokio::test]
    async fn test_auth_gates_research_but_not_health() {
        let harness = TestHarness::new(1000);
        let auth = AuthConfig {
            enabled: true,
            secret: "s3cret".into(),
        };
        let router = router_with(&harness, auth);

        // Missing token
        let response = router
            .clone()
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Wrong token
        let response = router
            .clone()
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[("Authorization", "Bearer wrong")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Correct token
        let response = router
            .clone()
            .oneshot(post_research(
                r#"{"idea": "Test topic with enough length"}"#,
                &[("Authorization", "Bearer s3cret")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Health stays open
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
