// Scribe Infrastructure - Web Search Client
//
// Implements the SearchClient port against a Tavily-style search API:
// one POST per query, bearer-keyed, with the engine's synthesized answer
// included.

use async_trait::async_trait;
use scribe_core::error::{AppError, Result};
use scribe_core::port::{SearchClient, SearchDepth, SearchResponse};
use serde_json::json;
use tracing::info;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct WebSearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl WebSearchClient {
    /// Build from the environment.
    ///
    /// - `WEB_SEARCH_KEY`: API credential (required)
    /// - `WEB_SEARCH_ENDPOINT`: endpoint override (tests, proxies)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("WEB_SEARCH_KEY")
            .map_err(|_| AppError::Config("WEB_SEARCH_KEY not set".to_string()))?;
        let endpoint =
            std::env::var("WEB_SEARCH_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Search(format!("Failed to build HTTP client: {}", e)))?;

        info!(endpoint = %endpoint, "Web search client initialized");

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl SearchClient for WebSearchClient {
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<SearchResponse> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": depth.to_string(),
            "max_results": max_results,
            "include_raw_content": include_raw_content,
            "include_answer": true,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Search returned {}: {}",
                status, text
            )));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| AppError::Search(format!("Search response unreadable: {}", e)))
    }
}
