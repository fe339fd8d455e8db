//! Tool description and invocation types shared by every [`crate::tools::Tool`]
//! implementation and by the LLM request adapter's tool-schema payload.

mod context;

pub use context::ToolContext;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of what a tool does, used only to label metrics and
/// client stubs; the executor does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Search,
    Edit,
    Execute,
    Fetch,
    Think,
    Other,
}

/// Default ceiling on a tool's returned text before the executor truncates it.
pub const DEFAULT_MAX_OUTPUT_LEN: usize = 30_000;

/// JSON-schema description of a tool, sent to the model as part of the
/// request so it knows what it can call and with what arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
    #[serde(default = "default_tool_kind")]
    pub kind: ToolKind,
    /// Returned text longer than this is truncated by the executor with a
    /// marker naming both the original and ceiling lengths.
    #[serde(default = "default_max_output_len")]
    pub max_output_len: usize,
}

fn default_tool_kind() -> ToolKind {
    ToolKind::Other
}

fn default_max_output_len() -> usize {
    DEFAULT_MAX_OUTPUT_LEN
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: Option<String>, input_schema: serde_json::Value, kind: ToolKind) -> Self {
        Self { name: name.into(), description, input_schema, kind, max_output_len: DEFAULT_MAX_OUTPUT_LEN }
    }
}

/// Text output of a successful tool call.
///
/// Kept as a single text field (rather than structured content blocks)
/// because every tool in this runtime returns plain text that is folded
/// back into the conversation as a `Message::Tool`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    pub text: String,
}

/// Error surfaced by a tool implementation or by the tool executor around it.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("tool call was cancelled")]
    Cancelled,

    #[error("tool call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("tool transport error: {0}")]
    Transport(String),
}
