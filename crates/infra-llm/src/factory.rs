// Provider selection

use crate::{CloudProvider, OpenAiCompatProvider};
use scribe_core::error::{AppError, Result};
use scribe_core::port::LlmProvider;
use std::sync::Arc;

/// Select a provider from the environment.
///
/// `LLM_PROVIDER` picks explicitly (`cloud` | `openai-compatible`);
/// otherwise the cloud credential wins, then the OpenAI-compatible key.
pub fn provider_from_env() -> Result<Arc<dyn LlmProvider>> {
    match std::env::var("LLM_PROVIDER").ok().as_deref() {
        Some("cloud") => return Ok(Arc::new(CloudProvider::from_env()?)),
        Some("openai-compatible") => return Ok(Arc::new(OpenAiCompatProvider::from_env()?)),
        Some(other) => {
            return Err(AppError::Config(format!(
                "Unknown LLM_PROVIDER '{}' (expected 'cloud' or 'openai-compatible')",
                other
            )))
        }
        None => {}
    }

    if std::env::var("LLM_PROVIDER_TOKEN").is_ok() {
        return Ok(Arc::new(CloudProvider::from_env()?));
    }
    if std::env::var("OPENAI_COMPATIBLE_KEY").is_ok() {
        return Ok(Arc::new(OpenAiCompatProvider::from_env()?));
    }

    Err(AppError::Config(
        "No LLM provider configured: set LLM_PROVIDER_TOKEN or OPENAI_COMPATIBLE_KEY".to_string(),
    ))
}
