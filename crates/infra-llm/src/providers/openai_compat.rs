// OpenAI-compatible provider
//
// Works against any endpoint following the OpenAI chat-completions and
// embeddings spec (OpenRouter, OpenAI, local proxies). Tool arguments
// arrive as JSON-encoded strings and are parsed into values; unparseable
// arguments are preserved as strings rather than dropped.

use crate::http_client;
use async_trait::async_trait;
use scribe_core::domain::EMBEDDING_DIM;
use scribe_core::error::{AppError, Result};
use scribe_core::port::{ChatMessage, Completion, LlmProvider, Role, ToolCall, ToolDefinition};
use serde_json::{json, Value};
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CHAT_MODEL: &str = "anthropic/claude-3-sonnet";
const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embed_model: String,
}

impl OpenAiCompatProvider {
    /// Build from the environment.
    ///
    /// - `OPENAI_COMPATIBLE_KEY`: bearer API key (required)
    /// - `OPENAI_COMPATIBLE_MODEL`: chat model id
    /// - `OPENAI_COMPATIBLE_EMBED_MODEL`: embeddings model id
    /// - `OPENAI_COMPATIBLE_BASE_URL`: endpoint base (default OpenRouter)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_COMPATIBLE_KEY").map_err(|_| {
            AppError::Config("OPENAI_COMPATIBLE_KEY not set for OpenAI-compatible provider".into())
        })?;
        let chat_model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let embed_model = std::env::var("OPENAI_COMPATIBLE_EMBED_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());
        let base_url = std::env::var("OPENAI_COMPATIBLE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        info!(
            base_url = %base_url,
            chat_model = %chat_model,
            "OpenAI-compatible LLM provider initialized"
        );

        Ok(Self {
            client: http_client()?,
            base_url,
            api_key,
            chat_model,
            embed_model,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Request returned {}: {}",
                status, text
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Llm(format!("Response unreadable: {}", e)))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        max_tokens: u32,
    ) -> Result<Completion> {
        let body = build_generate_body(&self.chat_model, messages, tools, max_tokens);
        let response = self.post("/chat/completions", &body).await?;
        parse_generate_response(&response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.embed_model,
            "input": [text],
            "dimensions": EMBEDDING_DIM,
        });
        let response = self.post("/embeddings", &body).await?;

        let embedding: Vec<f32> = response
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
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

fn convert_message(message: &ChatMessage) -> Value {
    match message.role {
        Role::System => json!({ "role": "system", "content": message.content }),
        Role::User => json!({ "role": "user", "content": message.content }),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        Role::Assistant => {
            let mut wire = json!({ "role": "assistant", "content": message.content });
            if !message.tool_calls.is_empty() {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.input.to_string(),
                            }
                        })
                    })
                    .collect();
                wire["tool_calls"] = Value::Array(calls);
            }
            wire
        }
    }
}

fn build_generate_body(
    model: &str,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
    max_tokens: u32,
) -> Value {
    let wire_messages: Vec<Value> = messages.iter().map(convert_message).collect();

    let mut body = json!({
        "model": model,
        "messages": wire_messages,
        "max_tokens": max_tokens,
    });

    if !tools.is_empty() {
        let wire_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = Value::Array(wire_tools);
    }

    body
}

fn parse_generate_response(response: &Value) -> Result<Completion> {
    let message = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| AppError::Llm("No choices in response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|tc| tc.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let id = call.get("id")?.as_str()?.to_string();
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let arguments = function.get("arguments")?.as_str().unwrap_or_default();
                    let input = serde_json::from_str(arguments)
                        .unwrap_or_else(|_| Value::String(arguments.to_string()));
                    Some(ToolCall { id, name, input })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Completion {
        content,
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::port::{assistant_message, tool_message, user_message};

    #[test]
    fn test_tool_role_maps_to_openai_tool_message() {
        let wire = convert_message(&tool_message("call_1", "web_search", "result"));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
        assert_eq!(wire["content"], "result");
    }

    #[test]
    fn test_assistant_tool_calls_serialize_arguments() {
        let wire = convert_message(&assistant_message(
            "",
            vec![ToolCall {
                id: "c1".into(),
                name: "web_search".into(),
                input: json!({ "query": "x" }),
            }],
        ));
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"x\"}"
        );
    }

    #[test]
    fn test_body_wraps_tools_as_functions() {
        let tools = [ToolDefinition {
            name: "rag_search".into(),
            description: "internal search".into(),
            parameters: json!({ "type": "object" }),
        }];
        let body = build_generate_body("model-x", &[user_message("q")], &tools, 1000);
        assert_eq!(body["model"], "model-x");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "rag_search");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "c1",
                        "function": { "name": "web_search", "arguments": "{\"query\":\"x\"}" }
                    }]
                }
            }]
        });
        let completion = parse_generate_response(&response).unwrap();
        assert!(completion.content.is_empty());
        assert_eq!(completion.tool_calls[0].input["query"], "x");
    }

    #[test]
    fn test_parse_keeps_unparseable_arguments_as_string() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "c1",
                        "function": { "name": "web_search", "arguments": "not json" }
                    }]
                }
            }]
        });
        let completion = parse_generate_response(&response).unwrap();
        assert_eq!(completion.tool_calls[0].input, Value::String("not json".into()));
    }

    #[test]
    fn test_parse_missing_choices_errors() {
        assert!(parse_generate_response(&json!({})).is_err());
    }
}
