//! Agent state threaded through the step loop.
//!
//! Adapted from loom's `ReActState` (messages plus per-round tool calls and
//! results); extended with the step counter and budget the spec's step loop
//! needs to enforce termination.

use crate::message::{Message, ToolCall, ToolResult};

/// State flowing through one run of the agent step loop.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub messages: Vec<Message>,
    /// Tool calls proposed by the most recent assistant turn, pending execution.
    pub pending_tool_calls: Vec<ToolCall>,
    /// Results of the most recently executed tool calls.
    pub tool_results: Vec<ToolResult>,
    /// Number of think/act/observe cycles completed so far.
    pub step_count: usize,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, ..Default::default() }
    }

    /// Text of the last assistant message, if any, for use as the run's final reply.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending_tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_assistant_reply_skips_tool_and_user_messages() {
        let state = AgentState::new(vec![
            Message::user("hi"),
            Message::assistant("first"),
            Message::tool("c1", "result"),
        ]);
        assert_eq!(state.last_assistant_reply(), Some("first"));
    }
}
