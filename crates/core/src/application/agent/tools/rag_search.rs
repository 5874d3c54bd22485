// rag_search tool adapter
//
// Embeds the query, searches the chunk store by cosine distance, and formats
// results with age metadata so agents can reason about data freshness.
// Errors are returned as text the agent can see, never raised.

use crate::application::PipelineDeps;
use serde::Deserialize;

pub const RAG_SEARCH_TOOL: &str = "rag_search";

const RAG_RESULT_LIMIT: usize = 3;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Deserialize)]
pub struct RagSearchArgs {
    pub query: String,
    #[serde(default)]
    pub max_age_days: Option<i64>,
}

pub async fn run(deps: &PipelineDeps, args: RagSearchArgs) -> String {
    let query_embedding = match deps.llm.embed(&args.query).await {
        Ok(embedding) => embedding,
        Err(e) => return format!("Error generating embedding: {}", e),
    };

    let results = match deps
        .chunks
        .search(&query_embedding, RAG_RESULT_LIMIT, args.max_age_days)
        .await
    {
        Ok(results) => results,
        Err(e) => return format!("Error searching research database: {}", e),
    };

    if results.is_empty() {
        let age_note = args
            .max_age_days
            .map(|days| format!(" (within last {} days)", days))
            .unwrap_or_default();
        return format!(
            "[RAG] No relevant information found in the research database{}.",
            age_note
        );
    }

    let now = deps.time.now_millis();
    let formatted: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let header = result_header(idx + 1, chunk.created_at, now);
            format!("{}\nContent: {}", header, chunk.content)
        })
        .collect();

    format!(
        "[RAG] Found the following relevant info:\n\n{}",
        formatted.join("\n\n")
    )
}

fn result_header(index: usize, created_at: i64, now: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(created_at) {
        Some(date) => {
            let age_days = ((now - created_at) / MILLIS_PER_DAY).max(0);
            let age_text = match age_days {
                0 => "today".to_string(),
                1 => "1 day ago".to_string(),
                n => format!("{} days ago", n),
            };
            format!(
                "--- Result {} (Retrieved: {}, {}) ---",
                index,
                date.format("%Y-%m-%d"),
                age_text
            )
        }
        None => format!("--- Result {} (age unknown) ---", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_today() {
        let now = 1_700_000_000_000;
        let header = result_header(1, now, now);
        assert!(header.contains("today"), "{}", header);
        assert!(header.starts_with("--- Result 1 (Retrieved: "));
    }

    #[test]
    fn test_header_one_day_ago() {
        let now = 1_700_000_000_000;
        let header = result_header(2, now - MILLIS_PER_DAY, now);
        assert!(header.contains("1 day ago"), "{}", header);
    }

    #[test]
    fn test_header_n_days_ago() {
        let now = 1_700_000_000_000;
        let header = result_header(3, now - 6 * MILLIS_PER_DAY, now);
        assert!(header.contains("6 days ago"), "{}", header);
    }

    #[test]
    fn test_header_date_format() {
        // 2023-11-14T22:13:20Z
        let created = 1_700_000_000_000;
        let header = result_header(1, created, created);
        assert!(header.contains("2023-11-14"), "{}", header);
    }

    mod retrieval {
        use super::*;
        use crate::domain::Chunk;
        use crate::port::mocks::{ScriptedLlmProvider, TestHarness};
        use crate::port::ChunkRepository;

        const NOW: i64 = 1_700_000_000_000;

        async fn seed_chunk(harness: &TestHarness, id: &str, content: &str, created_at: i64) {
            let chunk = Chunk::new(
                id,
                "job-1",
                content,
                ScriptedLlmProvider::embedding_for(content),
                created_at,
            );
            harness.chunks.insert_many(&[chunk]).await.unwrap();
        }

        #[tokio::test]
        async fn test_age_filter_boundary_is_inclusive() {
            let harness = TestHarness::new(NOW);
            seed_chunk(&harness, "c-recent", "recent finding six days old", NOW - 6 * MILLIS_PER_DAY).await;
            seed_chunk(&harness, "c-old", "stale finding eight days old", NOW - 8 * MILLIS_PER_DAY).await;
            seed_chunk(&harness, "c-edge", "edge finding exactly at cutoff", NOW - 7 * MILLIS_PER_DAY).await;

            let text = run(
                &harness.deps,
                RagSearchArgs {
                    query: "recent finding six days old".into(),
                    max_age_days: Some(7),
                },
            )
            .await;

            assert!(text.contains("recent finding six days old"), "{}", text);
            assert!(text.contains("edge finding exactly at cutoff"), "{}", text);
            assert!(!text.contains("stale finding eight days old"), "{}", text);
        }

        #[tokio::test]
        async fn test_without_age_filter_all_chunks_are_eligible() {
            let harness = TestHarness::new(NOW);
            seed_chunk(&harness, "c-1", "first research paragraph", NOW - 6 * MILLIS_PER_DAY).await;
            seed_chunk(&harness, "c-2", "second research paragraph", NOW - 8 * MILLIS_PER_DAY).await;

            let text = run(
                &harness.deps,
                RagSearchArgs {
                    query: "first research paragraph".into(),
                    max_age_days: None,
                },
            )
            .await;

            assert!(text.contains("first research paragraph"));
            assert!(text.contains("second research paragraph"));
        }

        #[tokio::test]
        async fn test_no_results_mentions_age_filter() {
            let harness = TestHarness::new(NOW);

            let text = run(
                &harness.deps,
                RagSearchArgs {
                    query: "anything".into(),
                    max_age_days: Some(3),
                },
            )
            .await;

            assert_eq!(
                text,
                "[RAG] No relevant information found in the research database (within last 3 days)."
            );

            let text = run(
                &harness.deps,
                RagSearchArgs {
                    query: "anything".into(),
                    max_age_days: None,
                },
            )
            .await;
            assert_eq!(
                text,
                "[RAG] No relevant information found in the research database."
            );
        }

        #[tokio::test]
        async fn test_embedding_failure_is_observable_text() {
            let harness = TestHarness::new(NOW);
            harness.llm.fail_embeddings();

            let text = run(
                &harness.deps,
                RagSearchArgs {
                    query: "anything".into(),
                    max_age_days: None,
                },
            )
            .await;

            assert!(text.starts_with("Error generating embedding:"), "{}", text);
        }
    }
}
