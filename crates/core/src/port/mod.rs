// Port Layer - Interfaces for external dependencies

pub mod agent_log_repository;
pub mod chunk_repository;
pub mod id_provider; // For deterministic testing
pub mod idempotency_cache;
pub mod job_repository;
pub mod llm_provider;
pub mod mocks;
pub mod search_client;
pub mod task_repository;
pub mod time_provider;
pub mod work_queue;

// Re-exports
pub use agent_log_repository::AgentLogRepository;
pub use chunk_repository::ChunkRepository;
pub use id_provider::IdProvider;
pub use idempotency_cache::{IdempotencyCache, IDEMPOTENCY_TTL_MS};
pub use job_repository::JobRepository;
pub use llm_provider::{
    assistant_message, system_message, tool_message, user_message, ChatMessage, Completion,
    LlmProvider, Role, ToolCall, ToolDefinition,
};
pub use search_client::{SearchClient, SearchDepth, SearchResponse, SearchResult};
pub use task_repository::TaskRepository;
pub use time_provider::TimeProvider;
pub use work_queue::{QueueMessage, WorkQueue};
