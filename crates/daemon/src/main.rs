//! Scribe Research Engine - Main Entry Point
//!
//! Composition root: wires the storage adapters, LLM provider, search
//! client, HTTP surface and worker pool together, runs crash recovery,
//! and supervises graceful shutdown.

mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scribe_api_http::{auth::AuthConfig, ApiServer, ApiServerConfig, ApiState};
use scribe_core::application::recovery::RecoveryService;
use scribe_core::application::worker::constants::DEFAULT_WORKER_CONCURRENCY;
use scribe_core::application::worker::WorkerPool;
use scribe_core::application::PipelineDeps;
use scribe_core::port::id_provider::UuidProvider;
use scribe_core::port::time_provider::SystemTimeProvider;
use scribe_infra_llm::provider_from_env;
use scribe_infra_search::WebSearchClient;
use scribe_infra_sqlite::{
    create_pool, run_migrations, SqliteAgentLogRepository, SqliteChunkRepository,
    SqliteIdempotencyCache, SqliteJobRepository, SqliteTaskRepository, SqliteWorkQueue,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.scribe/research.db";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Initialize logging (JSON for production, pretty for development)
    let log_format = std::env::var("SCRIBE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("scribe=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Scribe Research Engine v{} starting...", VERSION);

    // 1.1. Initialize OpenTelemetry (optional)
    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Load configuration
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

    let worker_concurrency: usize = std::env::var("SCRIBE_WORKER_CONCURRENCY")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WORKER_CONCURRENCY);

    info!(database_url = %database_url, "Initializing database...");

    // 3. Initialize database
    let pool = create_pool(&database_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let llm = provider_from_env().map_err(|e| anyhow::anyhow!("LLM provider setup failed: {}", e))?;
    info!(provider = llm.name(), "LLM provider selected");

    let search = Arc::new(
        WebSearchClient::from_env()
            .map_err(|e| anyhow::anyhow!("Search client setup failed: {}", e))?,
    );

    let queue = Arc::new(SqliteWorkQueue::new(pool.clone(), time_provider.clone()));

    let deps = PipelineDeps {
        jobs: Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone())),
        tasks: Arc::new(SqliteTaskRepository::new(pool.clone(), time_provider.clone())),
        chunks: Arc::new(SqliteChunkRepository::new(pool.clone(), time_provider.clone())),
        agent_logs: Arc::new(SqliteAgentLogRepository::new(pool.clone())),
        queue: queue.clone(),
        idempotency: Arc::new(SqliteIdempotencyCache::new(pool.clone(), time_provider.clone())),
        llm,
        search,
        time: time_provider.clone(),
        ids: id_provider,
    };

    // 5. Run crash recovery: return orphaned in-flight messages to delivery
    info!("Running crash recovery...");
    let recovery = RecoveryService::new(queue, time_provider, None);
    match recovery.recover_orphaned_messages().await {
        Ok(count) => info!(recovered_messages = count, "Crash recovery completed"),
        Err(e) => tracing::error!(error = ?e, "Crash recovery failed"),
    }

    // 6. Start HTTP server
    info!("Starting HTTP server...");
    let api_state = ApiState::new(deps.clone(), AuthConfig::from_env());
    let api_server = ApiServer::new(ApiServerConfig::default(), api_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            tracing::error!(error = %e, "HTTP server failed");
        }
    });

    // 7. Start worker pool
    info!(concurrency = worker_concurrency, "Starting worker pool...");
    let worker_pool = WorkerPool::spawn(deps, worker_concurrency);

    info!("System ready. Waiting for research requests...");
    info!("Press Ctrl+C to shutdown");

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 9. Graceful shutdown
    worker_pool
        .shutdown(std::time::Duration::from_secs(5))
        .await;
    server_handle.abort();

    info!("Shutdown complete.");

    Ok(())
}
