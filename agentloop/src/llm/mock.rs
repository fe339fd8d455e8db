//! Fixed-response LLM client used throughout this crate's tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSpec;

use super::{LlmClient, LlmError, LlmResponse, LlmUsage};

/// Replays a queue of canned responses, one per `invoke` call; repeats the
/// last response once the queue is drained so a test doesn't need to size
/// the queue exactly to the number of step-loop iterations it expects.
pub struct MockLlm {
    responses: Mutex<Vec<LlmResponse>>,
}

impl MockLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self { responses: Mutex::new(responses) }
    }

    /// A client that always replies with plain text and no tool calls.
    pub fn fixed_text(content: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: Some(LlmUsage { prompt_tokens: 1, completion_tokens: 1, total_tokens: 2, ..Default::default() }),
            reasoning: None,
        }])
    }

    /// A client whose only reply proposes the given tool call.
    pub fn calling_tool(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse {
            content: String::new(),
            tool_calls: vec![ToolCall { call_id: "call_1".to_string(), name: name.into(), arguments: arguments.into() }],
            usage: None,
            reasoning: None,
        }])
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<LlmResponse, LlmError> {
        let mut queue = self.responses.lock().unwrap();
        if queue.len() > 1 {
            Ok(clone_response(&queue.remove(0)))
        } else if let Some(last) = queue.first() {
            Ok(clone_response(last))
        } else {
            Err(LlmError::Transient("MockLlm has no responses configured".to_string()))
        }
    }
}

fn clone_response(r: &LlmResponse) -> LlmResponse {
    LlmResponse { content: r.content.clone(), tool_calls: r.tool_calls.clone(), usage: r.usage.clone(), reasoning: r.reasoning.clone() }
}
