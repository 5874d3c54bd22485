// Managed cloud provider
//
// Speaks the Anthropic messages wire format against a region-scoped model
// runtime, plus a Titan-style embeddings call. The generic `tool` role is
// mapped to user-side tool_result blocks, which is what this wire format
// expects for tool outputs.

use crate::http_client;
use async_trait::async_trait;
use scribe_core::domain::EMBEDDING_DIM;
use scribe_core::error::{AppError, Result};
use scribe_core::port::{ChatMessage, Completion, LlmProvider, Role, ToolCall, ToolDefinition};
use serde_json::{json, Value};
use tracing::info;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_PROFILE: &str = "default";
const DEFAULT_CHAT_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
const DEFAULT_EMBED_MODEL: &str = "amazon.titan-embed-text-v2:0";
const WIRE_VERSION: &str = "bedrock-2023-05-31";

pub struct CloudProvider {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    chat_model: String,
    embed_model: String,
}

impl CloudProvider {
    /// Build from the environment.
    ///
    /// - `LLM_PROVIDER_REGION`: runtime region (default us-east-1)
    /// - `LLM_PROVIDER_PROFILE`: credential profile name (default "default")
    /// - `LLM_PROVIDER_TOKEN`: bearer credential for the selected profile
    /// - `LLM_PROVIDER_ENDPOINT`: full endpoint override (tests, proxies)
    /// - `LLM_PROVIDER_CHAT_MODEL` / `LLM_PROVIDER_EMBED_MODEL`: model ids
    pub fn from_env() -> Result<Self> {
        let region =
            std::env::var("LLM_PROVIDER_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let profile =
            std::env::var("LLM_PROVIDER_PROFILE").unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        let token = std::env::var("LLM_PROVIDER_TOKEN").map_err(|_| {
            AppError::Config("LLM_PROVIDER_TOKEN not set for cloud provider".to_string())
        })?;
        let endpoint = std::env::var("LLM_PROVIDER_ENDPOINT")
            .unwrap_or_else(|_| format!("https://bedrock-runtime.{}.amazonaws.com", region));
        let chat_model = std::env::var("LLM_PROVIDER_CHAT_MODEL")
            .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let embed_model = std::env::var("LLM_PROVIDER_EMBED_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());

        info!(
            region = %region,
            profile = %profile,
            chat_model = %chat_model,
            "Cloud LLM provider initialized"
        );

        Ok(Self {
            client: http_client()?,
            endpoint,
            token,
            chat_model,
            embed_model,
        })
    }

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/model/{}/invoke", self.endpoint, model_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Cloud request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Cloud request returned {}: {}",
                status, text
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Llm(format!("Cloud response unreadable: {}", e)))
    }
}

#[async_trait]
impl LlmProvider for CloudProvider {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        max_tokens: u32,
    ) -> Result<Completion> {
        let body = build_generate_body(messages, tools, max_tokens);
        let response = self.invoke(&self.chat_model, &body).await?;
        parse_generate_response(&response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "inputText": text,
            "dimensions": EMBEDDING_DIM,
            "normalize": true,
        });
        let response = self.invoke(&self.embed_model, &body).await?;

        let embedding: Vec<f32> = response
            .get("embedding")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| AppError::Llm("Embedding missing from response".to_string()))?;

        if embedding.len() != EMBEDDING_DIM {
            return Err(AppError::Llm(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                EMBEDDING_DIM
            )));
        }
        Ok(embedding)
    }
}

/// Split out the system prompt and convert the history into wire messages.
fn convert_messages(messages: &[ChatMessage]) -> (String, Vec<Value>) {
    let mut system = String::new();
    let mut wire = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                system.push_str(&message.content);
                system.push('\n');
            }
            Role::Tool => {
                wire.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": message.tool_call_id,
                        "content": message.content,
                    }]
                }));
            }
            Role::Assistant => {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": message.content }));
                }
                for call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.input,
                    }));
                }
                wire.push(json!({ "role": "assistant", "content": blocks }));
            }
            Role::User => {
                wire.push(json!({ "role": "user", "content": message.content }));
            }
        }
    }

    (system.trim().to_string(), wire)
}

fn build_generate_body(
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
    max_tokens: u32,
) -> Value {
    let (system, wire_messages) = convert_messages(messages);

    let mut body = json!({
        "anthropic_version": WIRE_VERSION,
        "max_tokens": max_tokens,
        "messages": wire_messages,
    });

    if !system.is_empty() {
        body["system"] = Value::String(system);
    }

    if !tools.is_empty() {
        let wire_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();
        body["tools"] = Value::Array(wire_tools);
    }

    body
}

fn parse_generate_response(response: &Value) -> Result<Completion> {
    let blocks = response
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Llm("No content blocks in response".to_string()))?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    content.push_str(text);
                }
            }
            Some("tool_use") => {
                tool_calls.push(ToolCall {
                    id: block
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    name: block
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    input: block.get("input").cloned().unwrap_or(Value::Null),
                });
            }
            _ => {}
        }
    }

    Ok(Completion {
        content,
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::port::{assistant_message, system_message, tool_message, user_message};

    #[test]
    fn test_system_prompt_is_lifted_out() {
        let messages = [
            system_message("You are a researcher."),
            user_message("Find X"),
        ];
        let (system, wire) = convert_messages(&messages);
        assert_eq!(system, "You are a researcher.");
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[0]["content"], "Find X");
    }

    #[test]
    fn test_tool_result_becomes_user_block() {
        let messages = [tool_message("call_1", "web_search", "result text")];
        let (_, wire) = convert_messages(&messages);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[0]["content"][0]["type"], "tool_result");
        assert_eq!(wire[0]["content"][0]["tool_use_id"], "call_1");
        assert_eq!(wire[0]["content"][0]["content"], "result text");
    }

    #[test]
    fn test_assistant_tool_calls_become_tool_use_blocks() {
        let messages = [assistant_message(
            "thinking",
            vec![ToolCall {
                id: "call_1".into(),
                name: "web_search".into(),
                input: json!({ "query": "x" }),
            }],
        )];
        let (_, wire) = convert_messages(&messages);
        let blocks = wire[0]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["input"]["query"], "x");
    }

    #[test]
    fn test_body_includes_tools_and_budget() {
        let tools = [ToolDefinition {
            name: "web_search".into(),
            description: "search".into(),
            parameters: json!({ "type": "object" }),
        }];
        let body = build_generate_body(&[user_message("q")], &tools, 2000);
        assert_eq!(body["anthropic_version"], WIRE_VERSION);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["tools"][0]["name"], "web_search");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_text_and_tool_use() {
        let response = json!({
            "content": [
                { "type": "text", "text": "Let me search. " },
                { "type": "tool_use", "id": "c1", "name": "web_search", "input": { "query": "x" } }
            ]
        });
        let completion = parse_generate_response(&response).unwrap();
        assert_eq!(completion.content, "Let me search. ");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "web_search");
    }

    #[test]
    fn test_parse_missing_content_errors() {
        assert!(parse_generate_response(&json!({})).is_err());
    }
}
