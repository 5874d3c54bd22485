// Tool adapters callable by agents
//
// Tools never raise: every failure becomes observable text for the agent to
// reason about.

pub mod rag_search;
pub mod web_search;

use crate::application::agent::runner::RunContext;
use crate::application::PipelineDeps;
use crate::port::ToolDefinition;
use serde_json::json;

/// The tool whitelist entries an agent spec can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    WebSearch,
    RagSearch,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => web_search::WEB_SEARCH_TOOL,
            ToolKind::RagSearch => rag_search::RAG_SEARCH_TOOL,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolKind::WebSearch => web_search_definition(),
            ToolKind::RagSearch => rag_search_definition(),
        }
    }
}

/// Definitions for an agent's tool whitelist, in declaration order.
pub fn definitions(kinds: &[ToolKind]) -> Vec<ToolDefinition> {
    kinds.iter().map(ToolKind::definition).collect()
}

/// Execute a tool call by name. Unknown tools and malformed arguments are
/// reported back to the agent as text, never as errors.
pub async fn execute(
    deps: &PipelineDeps,
    _ctx: &RunContext,
    name: &str,
    input: &serde_json::Value,
) -> String {
    match name {
        web_search::WEB_SEARCH_TOOL => match serde_json::from_value(input.clone()) {
            Ok(args) => {
                let result = web_search::run(deps, args).await;
                result.to_string()
            }
            Err(e) => format!("Invalid arguments for {}: {}", name, e),
        },
        rag_search::RAG_SEARCH_TOOL => match serde_json::from_value(input.clone()) {
            Ok(args) => rag_search::run(deps, args).await,
            Err(e) => format!("Invalid arguments for {}: {}", name, e),
        },
        _ => format!("Tool {} not found.", name),
    }
}

fn web_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: web_search::WEB_SEARCH_TOOL.to_string(),
        description: "Search the web. Best for current events and broad research. \
                      Set deep_search=true to fan the query out into several \
                      sub-queries and merge the results."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                },
                "search_depth": {
                    "type": "string",
                    "enum": ["basic", "advanced"],
                    "description": "Depth of search. 'advanced' is deeper and more thorough.",
                    "default": "advanced"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results to return. Defaults to 5.",
                    "default": 5
                },
                "include_raw_content": {
                    "type": "boolean",
                    "description": "Whether to include full page content.",
                    "default": false
                },
                "deep_search": {
                    "type": "boolean",
                    "description": "If true, performs multiple searches for comprehensive coverage.",
                    "default": false
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn rag_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: rag_search::RAG_SEARCH_TOOL.to_string(),
        description: "Search the internal research database for relevant information. \
                      Results carry age metadata; pass max_age_days for \
                      time-sensitive queries (e.g. 7 for recent news)."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find relevant research chunks."
                },
                "max_age_days": {
                    "type": "integer",
                    "description": "Optional maximum age in days for results. Omit to search all data."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_have_object_schemas() {
        for kind in [ToolKind::WebSearch, ToolKind::RagSearch] {
            let def = kind.definition();
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
            assert_eq!(def.name, kind.name());
        }
    }

    #[test]
    fn test_definitions_preserve_order() {
        let defs = definitions(&[ToolKind::WebSearch, ToolKind::RagSearch]);
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "web_search");
        assert_eq!(defs[1].name, "rag_search");
    }
}
