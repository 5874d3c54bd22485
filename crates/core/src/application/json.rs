// Agent output parsing helpers
//
// Models frequently wrap JSON answers in markdown code fences; every parse
// goes through `clean_json_string` first. Parse helpers return Option and
// never panic: the pipeline treats unparseable soft-signal output as a null
// payload.

use crate::domain::ReportDraft;
use serde::de::DeserializeOwned;

/// Strip surrounding markdown code fences (```json ... ```), if present.
pub fn clean_json_string(s: &str) -> &str {
    let mut s = s.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a typed value from raw agent output.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_str(clean_json_string(raw)).ok()
}

/// Parse raw agent output into an arbitrary JSON value.
pub fn parse_value(raw: &str) -> Option<serde_json::Value> {
    serde_json::from_str(clean_json_string(raw)).ok()
}

/// Parse the planner's output: a JSON array of task titles.
/// Non-array JSON and unparseable output both yield None (fallback plan).
pub fn parse_plan(raw: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(clean_json_string(raw)).ok()?;
    let items = value.as_array()?;
    let titles: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .collect();
    if titles.is_empty() {
        None
    } else {
        Some(titles)
    }
}

#[derive(serde::Deserialize)]
struct StructuredDraft {
    summary: String,
    #[serde(default)]
    key_findings: Vec<String>,
    #[serde(default)]
    details: serde_json::Map<String, serde_json::Value>,
}

/// Parse the reporter's output into a report draft.
///
/// Output that is not a JSON object with at least a `summary` field becomes
/// the plain-text fallback; the raw text is never lost.
pub fn parse_report_draft(raw: &str) -> ReportDraft {
    match serde_json::from_str::<StructuredDraft>(clean_json_string(raw)) {
        Ok(draft) => ReportDraft::Structured {
            summary: draft.summary,
            key_findings: draft.key_findings,
            details: draft.details,
        },
        Err(_) => ReportDraft::PlainText {
            content: raw.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CriticVerdict;

    #[test]
    fn test_clean_json_string_plain() {
        assert_eq!(clean_json_string(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_clean_json_string_fenced() {
        let raw = "```json\n{\"approved\": true}\n```";
        assert_eq!(clean_json_string(raw), "{\"approved\": true}");
    }

    #[test]
    fn test_clean_json_string_bare_fence() {
        let raw = "```\n[1, 2]\n```";
        assert_eq!(clean_json_string(raw), "[1, 2]");
    }

    #[test]
    fn test_parse_json_typed() {
        let verdict: Option<CriticVerdict> =
            parse_json("```json\n{\"approved\": false, \"feedback\": \"more depth\"}\n```");
        let verdict = verdict.unwrap();
        assert!(!verdict.approved);
        assert_eq!(verdict.feedback, "more depth");
    }

    #[test]
    fn test_parse_plan_array() {
        let plan = parse_plan(r#"["Task one", "Task two"]"#).unwrap();
        assert_eq!(plan, vec!["Task one", "Task two"]);
    }

    #[test]
    fn test_parse_plan_rejects_non_array() {
        assert!(parse_plan(r#"{"tasks": []}"#).is_none());
        assert!(parse_plan("Not JSON").is_none());
        assert!(parse_plan("[]").is_none());
    }

    #[test]
    fn test_parse_report_draft_structured() {
        let raw = r#"{"summary": "s", "key_findings": ["f1"], "details": {"A": "text"}}"#;
        match parse_report_draft(raw) {
            ReportDraft::Structured {
                summary,
                key_findings,
                ..
            } => {
                assert_eq!(summary, "s");
                assert_eq!(key_findings, vec!["f1"]);
            }
            other => panic!("expected structured draft, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_draft_falls_back_to_plain_text() {
        match parse_report_draft("Not JSON at all") {
            ReportDraft::PlainText { content } => assert_eq!(content, "Not JSON at all"),
            other => panic!("expected plain text draft, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_draft_requires_summary() {
        // Valid JSON object, wrong shape: keep the raw text instead of
        // losing it.
        match parse_report_draft(r#"{"title": "x"}"#) {
            ReportDraft::PlainText { content } => assert_eq!(content, r#"{"title": "x"}"#),
            other => panic!("expected plain text draft, got {:?}", other),
        }
    }
}
