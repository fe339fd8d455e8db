//! LLM transport seam for the step loop.
//!
//! Adapted from loom's `LlmClient` trait nearly verbatim: the step loop
//! depends on `invoke`/`invoke_stream`, one concrete implementation talks to
//! an OpenAI-compatible chat-completions endpoint over `reqwest`
//! ([`ChatOpenAI`]), and [`MockLlm`] drives every test in this crate.
//! Non-OpenAI provider clients are out of scope.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::message::{Message, ToolCall};
use crate::stream::MessageChunk;

/// Tool choice mode for chat completions: when tools are present, controls
/// whether the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    #[default]
    Auto,
    None,
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!("unknown tool_choice: {s} (use auto, none, or required)")),
        }
    }
}

/// Delta for one tool call from LLM streaming.
#[derive(Clone, Debug)]
pub struct ToolCallDelta {
    pub call_id: Option<String>,
    pub name: Option<String>,
    pub arguments_delta: String,
}

/// Token usage for one LLM call, normalized to the canonical field names the
/// rest of the crate accumulates (provider-specific cache/reasoning
/// subfields are mapped onto these before the response leaves the adapter).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub cached_input_tokens: u32,
    #[serde(default)]
    pub cache_write_tokens: u32,
    #[serde(default)]
    pub reasoning_tokens: u32,
}

/// How the model's reasoning content (if any) was obtained, per the
/// extraction precedence order: native signed reasoning, an explicit
/// omission flag, or legacy models that put reasoning in plain text.
#[derive(Clone, Debug, PartialEq)]
pub enum ReasoningContent {
    Native { text: String, signature: Option<String> },
    Omitted,
    TextAsReasoning(String),
}

/// Response from one LLM completion.
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<LlmUsage>,
    pub reasoning: Option<ReasoningContent>,
}

/// Error from the LLM transport, pre-classified into the retry taxonomy so
/// the step loop never has to pattern-match on status codes or message text.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Connection failure or 5xx: retried up to `max_retries` with fixed delay.
    #[error("request failed: {0}")]
    Transient(String),
    /// Provider rate-limit: same retry policy as transient, logged at warning.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Fatal for the run; never retried.
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("response could not be parsed: {0}")]
    InvalidResponse(String),
    /// One request exceeded its budget; never retried within the step loop.
    #[error("request timed out")]
    Timeout,
}

impl LlmError {
    /// Whether the step loop should retry this error (up to `max_retries`).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transient(_) | LlmError::RateLimited(_))
    }
}

/// LLM client: given messages (and optional tool schemas), returns assistant
/// text and optional tool calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[Message], tools: &[crate::tool_source::ToolSpec]) -> Result<LlmResponse, LlmError>;

    /// Streaming variant: sends [`MessageChunk`]s through `chunk_tx` as they
    /// arrive, and still returns the complete response at the end.
    ///
    /// Default implementation calls `invoke` and sends the full content as
    /// one chunk, for clients (like [`MockLlm`]) with nothing to stream.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        tools: &[crate::tool_source::ToolSpec],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, LlmError> {
        let response = self.invoke(messages, tools).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx.send(MessageChunk { content: response.content.clone() }).await;
            }
        }
        Ok(response)
    }
}
