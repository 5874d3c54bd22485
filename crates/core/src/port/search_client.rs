// Web Search Client Port (Interface)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Search depth requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

impl std::fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchDepth::Basic => write!(f, "basic"),
            SearchDepth::Advanced => write!(f, "advanced"),
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Search engine response: an optional synthesized answer plus ranked
/// results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<SearchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_display() {
        assert_eq!(SearchDepth::Basic.to_string(), "basic");
        assert_eq!(SearchDepth::Advanced.to_string(), "advanced");
        assert_eq!(SearchDepth::default(), SearchDepth::Advanced);
    }
}
