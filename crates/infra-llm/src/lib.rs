// Scribe Infrastructure - LLM Provider Adapters
//
// Two backends behind the LlmProvider port: a managed cloud runtime
// (Anthropic messages wire format + Titan-style embeddings) and any
// OpenAI-compatible endpoint. Both are thin reqwest wire layers; all agent
// logic stays provider-agnostic in core.

mod factory;
mod providers;

pub use factory::provider_from_env;
pub use providers::cloud::CloudProvider;
pub use providers::openai_compat::OpenAiCompatProvider;

/// Request timeout applied to every provider call. Expiry surfaces as a
/// provider error and follows the recoverable handler path.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 120;

pub(crate) fn http_client() -> Result<reqwest::Client, scribe_core::AppError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| scribe_core::AppError::Llm(format!("Failed to build HTTP client: {}", e)))
}
