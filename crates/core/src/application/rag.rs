// Report chunking and vector persistence
//
// Chunks are created only from the approved, aggregated report and only
// once per job lifecycle (the `generating` status guards aggregation).

use crate::application::PipelineDeps;
use crate::domain::{Chunk, EMBEDDING_DIM};
use crate::error::Result;
use tracing::warn;

/// Paragraphs shorter than this are not worth indexing.
pub const MIN_CHUNK_LEN: usize = 50;

/// Flatten a report value into plain text for chunking.
///
/// Structured reports contribute their summary and detail sections;
/// plain-text fallbacks contribute their content verbatim.
pub fn flatten_report(report: &serde_json::Value) -> String {
    if let Some(obj) = report.as_object() {
        if obj.contains_key("summary") || obj.contains_key("details") {
            let mut text = String::new();
            if let Some(summary) = obj.get("summary").and_then(|v| v.as_str()) {
                text.push_str(&format!("Summary:\n{}\n\n", summary));
            }
            match obj.get("details") {
                Some(serde_json::Value::Object(details)) => {
                    for (section, content) in details {
                        let content_text = content
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| content.to_string());
                        text.push_str(&format!("Section: {}\n{}\n\n", section, content_text));
                    }
                }
                Some(serde_json::Value::Array(items)) => {
                    for item in items {
                        let item_text = item
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| item.to_string());
                        text.push_str(&format!("{}\n\n", item_text));
                    }
                }
                Some(other) if !other.is_null() => text.push_str(&other.to_string()),
                _ => {}
            }
            return text;
        }
        if let Some(content) = obj.get("content").and_then(|v| v.as_str()) {
            return content.to_string();
        }
    }
    if let Some(s) = report.as_str() {
        return s.to_string();
    }
    report.to_string()
}

/// Split the report into paragraphs, embed each, and store the batch.
///
/// Per-paragraph embedding failures are logged and skipped; the surviving
/// chunks are committed in one transaction. Returns the number of chunks
/// written.
pub async fn save_chunks(
    deps: &PipelineDeps,
    job_id: &str,
    report: &serde_json::Value,
) -> Result<usize> {
    let text = flatten_report(report);

    let mut chunks = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim) {
        if paragraph.chars().count() < MIN_CHUNK_LEN {
            continue;
        }
        match deps.llm.embed(paragraph).await {
            Ok(embedding) => {
                if embedding.len() != EMBEDDING_DIM {
                    warn!(
                        job_id = %job_id,
                        dimension = embedding.len(),
                        "Embedding has wrong dimension, skipping chunk"
                    );
                    continue;
                }
                chunks.push(Chunk::new(
                    deps.ids.generate_id(),
                    job_id,
                    paragraph,
                    embedding,
                    deps.time.now_millis(),
                ));
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to embed chunk, skipping");
            }
        }
    }

    if !chunks.is_empty() {
        deps.chunks.insert_many(&chunks).await?;
    }

    Ok(chunks.len())
}
