// Agent Runner - the conversation turn loop
//
// One run is strictly sequential; runs for different tasks are independent.
// Every turn is persisted as an AgentLog, best-effort: log failures never
// abort the turn.

use crate::application::agent::personas::AgentSpec;
use crate::application::agent::tools;
use crate::application::PipelineDeps;
use crate::domain::{AgentLog, LogRole};
use crate::error::Result;
use crate::port::{assistant_message, system_message, tool_message, user_message};
use tracing::{debug, warn};

/// Maximum conversation turns before the runner gives up.
pub const MAX_AGENT_TURNS: usize = 5;

/// Returned when the turn budget elapses without a text-only answer.
pub const MAX_TURNS_SENTINEL: &str = "Max turns reached.";

/// Per-invocation context threaded into the runner so the log sink can
/// attach the owning job.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub job_id: String,
}

/// Run an agent on an input until it answers with text (or the turn budget
/// runs out).
pub async fn run_agent(
    deps: &PipelineDeps,
    spec: &AgentSpec,
    input: &str,
    ctx: &RunContext,
) -> Result<String> {
    let tool_defs = tools::definitions(spec.tools);
    let mut history = vec![system_message(spec.instructions), user_message(input)];

    persist_log(deps, ctx, spec.name, LogRole::User, input, None).await;

    for turn in 0..MAX_AGENT_TURNS {
        let completion = deps
            .llm
            .generate(&history, &tool_defs, spec.max_tokens)
            .await?;

        let tool_calls_value = if completion.tool_calls.is_empty() {
            None
        } else {
            serde_json::to_value(&completion.tool_calls).ok()
        };
        persist_log(
            deps,
            ctx,
            spec.name,
            LogRole::Assistant,
            &completion.content,
            tool_calls_value,
        )
        .await;

        history.push(assistant_message(
            &completion.content,
            completion.tool_calls.clone(),
        ));

        if completion.tool_calls.is_empty() {
            return Ok(completion.content);
        }

        debug!(
            agent = spec.name,
            turn = turn,
            tool_calls = completion.tool_calls.len(),
            "Executing tool calls"
        );

        for call in &completion.tool_calls {
            let output = tools::execute(deps, ctx, &call.name, &call.input).await;
            persist_log(deps, ctx, spec.name, LogRole::Tool, &output, None).await;
            history.push(tool_message(&call.id, &call.name, &output));
        }
    }

    warn!(agent = spec.name, job_id = %ctx.job_id, "Agent hit the turn budget");
    Ok(MAX_TURNS_SENTINEL.to_string())
}

async fn persist_log(
    deps: &PipelineDeps,
    ctx: &RunContext,
    agent_name: &str,
    role: LogRole,
    content: &str,
    tool_calls: Option<serde_json::Value>,
) {
    let log = AgentLog {
        id: deps.ids.generate_id(),
        job_id: ctx.job_id.clone(),
        agent_name: agent_name.to_string(),
        role,
        content: content.to_string(),
        tool_calls,
        timestamp: deps.time.now_millis(),
    };
    if let Err(e) = deps.agent_logs.insert(&log).await {
        warn!(agent = agent_name, error = %e, "Failed to persist agent log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent::tools::ToolKind;
    use crate::domain::LogRole;
    use crate::port::mocks::TestHarness;
    use crate::port::{Completion, SearchResponse, SearchResult, ToolCall};

    fn test_spec(tools: &'static [ToolKind]) -> AgentSpec {
        AgentSpec {
            name: "TestAgent",
            instructions: "You are a test persona.",
            tools,
            max_tokens: 1000,
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            job_id: "job-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_text_response_ends_the_run() {
        let harness = TestHarness::new(1000);
        harness.llm.script_text("test persona", "final answer");

        let answer = run_agent(&harness.deps, &test_spec(&[]), "question", &ctx())
            .await
            .unwrap();

        assert_eq!(answer, "final answer");

        let logs = harness.agent_logs.all();
        assert_eq!(logs.len(), 2); // user + assistant
        assert_eq!(logs[0].role, LogRole::User);
        assert_eq!(logs[1].role, LogRole::Assistant);
        assert!(logs.iter().all(|l| l.job_id == "job-1"));
    }

    #[tokio::test]
    async fn test_tool_call_is_executed_and_reinjected() {
        let harness = TestHarness::new(1000);
        harness.search.set_response(SearchResponse {
            answer: "the answer".into(),
            results: vec![SearchResult {
                title: "t".into(),
                url: "https://example.com".into(),
                content: "c".into(),
                score: Some(1.0),
            }],
        });
        harness.llm.script_completion(
            "test persona",
            Completion {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "web_search".into(),
                    input: serde_json::json!({ "query": "rust" }),
                }],
            },
        );
        harness.llm.script_text("test persona", "done");

        let answer = run_agent(
            &harness.deps,
            &test_spec(&[ToolKind::WebSearch]),
            "question",
            &ctx(),
        )
        .await
        .unwrap();

        assert_eq!(answer, "done");
        assert_eq!(harness.search.recorded_queries(), vec!["rust"]);

        let logs = harness.agent_logs.all();
        // user, assistant (tool call), tool result, assistant (answer)
        assert_eq!(logs.len(), 4);
        assert_eq!(logs[2].role, LogRole::Tool);
        assert!(logs[2].content.contains("the answer"));
        assert!(logs[1].tool_calls.is_some());
    }

    #[tokio::test]
    async fn test_turn_budget_yields_sentinel() {
        let harness = TestHarness::new(1000);
        // Sticky tool-calling response: the agent never answers with text.
        harness.llm.script_completion(
            "test persona",
            Completion {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "web_search".into(),
                    input: serde_json::json!({ "query": "loop" }),
                }],
            },
        );

        let answer = run_agent(
            &harness.deps,
            &test_spec(&[ToolKind::WebSearch]),
            "question",
            &ctx(),
        )
        .await
        .unwrap();

        assert_eq!(answer, MAX_TURNS_SENTINEL);
        assert_eq!(harness.search.recorded_queries().len(), MAX_AGENT_TURNS);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_as_text() {
        let harness = TestHarness::new(1000);
        harness.llm.script_completion(
            "test persona",
            Completion {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "no_such_tool".into(),
                    input: serde_json::json!({}),
                }],
            },
        );
        harness.llm.script_text("test persona", "recovered");

        let answer = run_agent(&harness.deps, &test_spec(&[]), "question", &ctx())
            .await
            .unwrap();

        assert_eq!(answer, "recovered");
        let logs = harness.agent_logs.all();
        assert!(logs
            .iter()
            .any(|l| l.role == LogRole::Tool && l.content.contains("not found")));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let harness = TestHarness::new(1000);
        harness.llm.script_error("test persona", "upstream 500");

        let result = run_agent(&harness.deps, &test_spec(&[]), "question", &ctx()).await;
        assert!(result.is_err());
    }
}
