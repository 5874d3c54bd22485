// Typed agent outputs
//
// LLM agents emit loosely-typed JSON; each expected shape gets an explicit
// type here. Parse failures never panic: soft-signal payloads degrade to
// None, the reporter output degrades to a plain-text draft.

use serde::{Deserialize, Serialize};

/// Critic verdict over a researched task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticVerdict {
    pub approved: bool,
    #[serde(default)]
    pub feedback: String,
}

/// Final critic output over the aggregated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalCritique {
    pub approved: bool,
    #[serde(default)]
    pub critique: String,
    #[serde(default)]
    pub required_edits: Vec<String>,
}

/// One falsifiable hypothesis for a research task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub statement: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisSet {
    pub hypotheses: Vec<Hypothesis>,
}

/// Evidence quality scores for a task's findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRating {
    pub relevance_score: f64,
    pub credibility_score: f64,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub weak_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionDetail {
    pub claim_challenged: String,
    #[serde(default)]
    pub contradictory_evidence: String,
    #[serde(default)]
    pub source: String,
}

/// Contradiction search outcome for a task's findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionReport {
    pub contradictions_found: bool,
    #[serde(default)]
    pub details: Vec<ContradictionDetail>,
}

/// The aggregated report draft.
///
/// Structured is the reporter's contract shape; PlainText is the fallback
/// when the reporter output fails to parse as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportDraft {
    Structured {
        summary: String,
        key_findings: Vec<String>,
        details: serde_json::Map<String, serde_json::Value>,
    },
    PlainText {
        content: String,
    },
}

impl ReportDraft {
    /// Serialize to the persisted/client-visible JSON shape.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ReportDraft::Structured {
                summary,
                key_findings,
                details,
            } => serde_json::json!({
                "summary": summary,
                "key_findings": key_findings,
                "details": details,
            }),
            ReportDraft::PlainText { content } => serde_json::json!({
                "content": content,
                "format": "plain_text",
            }),
        }
    }
}
