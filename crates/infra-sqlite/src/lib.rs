// Scribe Infrastructure - SQLite Adapters
// Implements: JobRepository, TaskRepository, ChunkRepository,
// AgentLogRepository, WorkQueue, IdempotencyCache

mod agent_log_repository;
mod chunk_repository;
mod connection;
mod error_map;
mod idempotency_store;
mod job_repository;
mod migration;
mod queue_store;
mod task_repository;

pub use agent_log_repository::SqliteAgentLogRepository;
pub use chunk_repository::SqliteChunkRepository;
pub use connection::{create_memory_pool, create_pool};
pub use idempotency_store::SqliteIdempotencyCache;
pub use job_repository::SqliteJobRepository;
pub use migration::run_migrations;
pub use queue_store::SqliteWorkQueue;
pub use task_repository::SqliteTaskRepository;

// Note: sqlx::Error conversion lives in error_map (orphan rules prevent a
// From<sqlx::Error> impl for scribe_core::AppError here).
