//! `LlmClient` implementation for OpenAI-compatible chat-completions endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSpec;

use super::{LlmClient, LlmError, LlmResponse, LlmUsage, ReasoningContent};

/// Talks to a single OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ChatOpenAI {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatOpenAI {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key, model: model.into() }
    }

    fn request_body(&self, messages: &[Message], tools: &[ToolSpec]) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
            "stream": false,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": { "name": t.name, "description": t.description, "parameters": t.input_schema },
                }))
                .collect::<Vec<_>>());
        }
        body
    }
}

fn wire_message(m: &Message) -> serde_json::Value {
    match m {
        Message::System { content } => json!({ "role": "system", "content": content }),
        Message::User { content } => json!({ "role": "user", "content": content }),
        Message::Assistant { content, tool_calls } => {
            let mut v = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                v["tool_calls"] = json!(tool_calls
                    .iter()
                    .map(|c| json!({
                        "id": c.call_id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    }))
                    .collect::<Vec<_>>());
            }
            v
        }
        Message::Tool { tool_call_id, content } => json!({ "role": "tool", "tool_call_id": tool_call_id, "content": content }),
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<UsageWire>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Default)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallWire>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning_signature: Option<String>,
    #[serde(default)]
    omitted_reasoning_content: bool,
}

#[derive(Deserialize, Serialize)]
struct ToolCallWire {
    id: String,
    function: FunctionWire,
}

#[derive(Deserialize, Serialize)]
struct FunctionWire {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Default)]
struct UsageWire {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Deserialize, Default)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u32,
}

#[derive(Deserialize, Default)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: u32,
}

/// Extracts reasoning content per the precedence order: native signed
/// reasoning, then an explicit omission flag, then plain assistant text
/// treated as reasoning for legacy models, else none.
fn extract_reasoning(msg: &ChoiceMessage) -> Option<ReasoningContent> {
    if let Some(text) = &msg.reasoning_content {
        return Some(ReasoningContent::Native { text: text.clone(), signature: msg.reasoning_signature.clone() });
    }
    if msg.omitted_reasoning_content {
        return Some(ReasoningContent::Omitted);
    }
    None
}

/// Maps an HTTP status onto the retry taxonomy: 401/403 are fatal
/// authentication failures, 429 is a rate limit, other 5xx are transient,
/// everything else (4xx request shape issues) is treated as transient too
/// since the step loop has no finer-grained "invalid argument" path here.
fn classify_http_error(status: reqwest::StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::Authentication(format!("http {status}: {body}")),
        429 => LlmError::RateLimited(format!("http {status}: {body}")),
        _ => LlmError::Transient(format!("http {status}: {body}")),
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<LlmResponse, LlmError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&self.request_body(messages, tools));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Transient(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, body));
        }
        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| LlmError::InvalidResponse("no choices".to_string()))?;
        let reasoning = extract_reasoning(&choice.message);
        let content = choice.message.content.clone().unwrap_or_default();
        let reasoning = reasoning.or_else(|| (!content.is_empty() && choice.message.tool_calls.is_empty()).then(|| ReasoningContent::TextAsReasoning(content.clone())));
        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|c| ToolCall { call_id: c.id, name: c.function.name, arguments: c.function.arguments })
            .collect();
        let usage = parsed.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            cached_input_tokens: u.prompt_tokens_details.map(|d| d.cached_tokens).unwrap_or(0),
            cache_write_tokens: 0,
            reasoning_tokens: u.completion_tokens_details.map(|d| d.reasoning_tokens).unwrap_or(0),
        });
        Ok(LlmResponse { content, tool_calls, usage, reasoning })
    }
}
