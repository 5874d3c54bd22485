// web_search tool adapter
//
// Standard mode delegates a single query to the search client. Deep mode
// asks the LLM for sub-queries first, fans out, and merges: per-query
// failures are skipped, results are deduplicated by URL, and content is
// capped so a single page cannot flood the agent's context.

use crate::application::PipelineDeps;
use crate::port::{system_message, user_message, SearchDepth, SearchResult};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Per-result content cap; longer content is cut and suffixed.
pub const MAX_RESULT_CONTENT_LEN: usize = 5000;
const TRUNCATION_SUFFIX: &str = "...(truncated)";

/// Hard cap on fan-out queries in deep mode.
const MAX_DEEP_QUERIES: usize = 4;

const SUBQUERY_MAX_TOKENS: u32 = 500;
const SUBQUERY_INSTRUCTIONS: &str = "You are a research assistant. Generate 3 distinct, \
     specific search queries to comprehensively research the user's topic. \
     Output ONLY the queries, one per line.";

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    #[serde(default)]
    pub search_depth: SearchDepth,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub include_raw_content: bool,
    #[serde(default)]
    pub deep_search: bool,
}

fn default_max_results() -> u32 {
    5
}

/// Run the tool. Always returns a JSON value: `{answer, results}` on
/// success, `{error}` on failure.
pub async fn run(deps: &PipelineDeps, args: WebSearchArgs) -> serde_json::Value {
    let outcome = if args.deep_search {
        deep_search(deps, &args).await
    } else {
        standard_search(deps, &args).await
    };

    match outcome {
        Ok(value) => value,
        Err(e) => json!({ "error": format!("Error performing search: {}", e) }),
    }
}

async fn standard_search(
    deps: &PipelineDeps,
    args: &WebSearchArgs,
) -> crate::error::Result<serde_json::Value> {
    let response = deps
        .search
        .search(
            &args.query,
            args.search_depth,
            args.max_results,
            args.include_raw_content,
        )
        .await?;

    Ok(format_output(&response.answer, response.results))
}

/// Fan the query out into LLM-generated sub-queries and merge the results.
async fn deep_search(
    deps: &PipelineDeps,
    args: &WebSearchArgs,
) -> crate::error::Result<serde_json::Value> {
    let queries = expand_queries(deps, &args.query).await;

    let results_per_query = std::cmp::max(2, args.max_results / queries.len() as u32);

    let mut answer = String::new();
    let mut merged: Vec<SearchResult> = Vec::new();

    for query in queries.iter().take(MAX_DEEP_QUERIES) {
        match deps
            .search
            .search(
                query,
                args.search_depth,
                results_per_query,
                args.include_raw_content,
            )
            .await
        {
            Ok(response) => {
                if answer.is_empty() && !response.answer.is_empty() {
                    answer = response.answer;
                }
                merged.extend(response.results);
            }
            Err(e) => {
                // Individual sub-query failures are skipped, not propagated.
                warn!(query = %query, error = %e, "Deep search sub-query failed");
            }
        }
    }

    let deduped = dedupe_by_url(merged);
    let capped: Vec<SearchResult> = deduped
        .into_iter()
        .take(args.max_results as usize * 2)
        .collect();

    Ok(format_output(&answer, capped))
}

/// Ask the LLM for sub-queries; fall back to the original query alone when
/// generation fails or yields nothing.
async fn expand_queries(deps: &PipelineDeps, query: &str) -> Vec<String> {
    let messages = [system_message(SUBQUERY_INSTRUCTIONS), user_message(query)];

    let mut queries: Vec<String> = match deps.llm.generate(&messages, &[], SUBQUERY_MAX_TOKENS).await
    {
        Ok(completion) => completion
            .content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        Err(e) => {
            warn!(error = %e, "Sub-query generation failed, using original query");
            Vec::new()
        }
    };

    if !queries.iter().any(|q| q == query) {
        queries.insert(0, query.to_string());
    }
    queries.dedup();
    queries
}

fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

fn format_output(answer: &str, results: Vec<SearchResult>) -> serde_json::Value {
    let formatted: Vec<serde_json::Value> = results
        .into_iter()
        .map(|r| {
            json!({
                "title": r.title,
                "url": r.url,
                "content": truncate_content(r.content),
                "score": r.score,
            })
        })
        .collect();

    json!({ "answer": answer, "results": formatted })
}

fn truncate_content(content: String) -> String {
    if content.chars().count() > MAX_RESULT_CONTENT_LEN {
        let mut truncated: String = content.chars().take(MAX_RESULT_CONTENT_LEN).collect();
        truncated.push_str(TRUNCATION_SUFFIX);
        truncated
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content_under_limit_is_untouched() {
        let content = "short".to_string();
        assert_eq!(truncate_content(content), "short");
    }

    #[test]
    fn test_truncate_content_at_limit_is_untouched() {
        let content = "x".repeat(MAX_RESULT_CONTENT_LEN);
        assert_eq!(truncate_content(content.clone()), content);
    }

    #[test]
    fn test_truncate_content_over_limit_gets_suffix() {
        let content = "x".repeat(MAX_RESULT_CONTENT_LEN + 1);
        let truncated = truncate_content(content);
        assert!(truncated.ends_with(TRUNCATION_SUFFIX));
        assert_eq!(
            truncated.chars().count(),
            MAX_RESULT_CONTENT_LEN + TRUNCATION_SUFFIX.chars().count()
        );
    }

    #[test]
    fn test_dedupe_by_url_keeps_first_occurrence() {
        let results = vec![
            SearchResult {
                title: "a".into(),
                url: "https://example.com/1".into(),
                content: "first".into(),
                score: Some(0.9),
            },
            SearchResult {
                title: "b".into(),
                url: "https://example.com/1".into(),
                content: "dup".into(),
                score: Some(0.8),
            },
            SearchResult {
                title: "c".into(),
                url: "https://example.com/2".into(),
                content: "other".into(),
                score: None,
            },
        ];
        let deduped = dedupe_by_url(results);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].content, "first");
        assert_eq!(deduped[1].url, "https://example.com/2");
    }

    #[test]
    fn test_args_defaults() {
        let args: WebSearchArgs =
            serde_json::from_value(json!({ "query": "rust async runtimes" })).unwrap();
        assert_eq!(args.max_results, 5);
        assert_eq!(args.search_depth, SearchDepth::Advanced);
        assert!(!args.include_raw_content);
        assert!(!args.deep_search);
    }

    mod deep {
        use super::*;
        use crate::port::mocks::TestHarness;
        use crate::port::SearchResponse;

        fn args(deep: bool) -> WebSearchArgs {
            WebSearchArgs {
                query: "solid state batteries".into(),
                search_depth: SearchDepth::Advanced,
                max_results: 5,
                include_raw_content: false,
                deep_search: deep,
            }
        }

        #[tokio::test]
        async fn test_standard_search_returns_answer_and_results() {
            let harness = TestHarness::new(1000);
            harness.search.set_response(SearchResponse {
                answer: "short answer".into(),
                results: vec![SearchResult {
                    title: "t".into(),
                    url: "https://example.com".into(),
                    content: "body".into(),
                    score: Some(0.5),
                }],
            });

            let value = run(&harness.deps, args(false)).await;
            assert_eq!(value["answer"], "short answer");
            assert_eq!(value["results"].as_array().unwrap().len(), 1);
            assert_eq!(harness.search.recorded_queries().len(), 1);
        }

        #[tokio::test]
        async fn test_standard_search_error_is_observable() {
            let harness = TestHarness::new(1000);
            harness.search.fail_searches();

            let value = run(&harness.deps, args(false)).await;
            assert!(value["error"]
                .as_str()
                .unwrap()
                .starts_with("Error performing search:"));
        }

        #[tokio::test]
        async fn test_deep_search_fans_out_llm_subqueries() {
            let harness = TestHarness::new(1000);
            harness
                .llm
                .script_text("Generate 3 distinct", "angle one\nangle two\nangle three");
            harness.search.set_response(SearchResponse {
                answer: "deep answer".into(),
                results: vec![SearchResult {
                    title: "t".into(),
                    url: "https://example.com/page".into(),
                    content: "body".into(),
                    score: None,
                }],
            });

            let value = run(&harness.deps, args(true)).await;

            // Original query plus three generated, capped at four.
            let queries = harness.search.recorded_queries();
            assert_eq!(queries.len(), 4);
            assert_eq!(queries[0], "solid state batteries");

            // Same URL from every sub-query: deduplicated down to one.
            assert_eq!(value["results"].as_array().unwrap().len(), 1);
            assert_eq!(value["answer"], "deep answer");
        }

        #[tokio::test]
        async fn test_deep_search_falls_back_when_subquery_generation_fails() {
            let harness = TestHarness::new(1000);
            harness
                .llm
                .script_error("Generate 3 distinct", "model unavailable");
            harness.search.set_response(SearchResponse::default());

            let value = run(&harness.deps, args(true)).await;

            assert_eq!(
                harness.search.recorded_queries(),
                vec!["solid state batteries"]
            );
            assert!(value.get("error").is_none());
        }
    }
}
