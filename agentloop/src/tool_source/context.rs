//! Context passed into tool calls for the current step.
//!
//! Extends loom's `ToolCallContext` with the run's working directory and its
//! [`CancellationToken`], since the spec's tool executor needs both to bound
//! where a tool can touch the filesystem and to let a long-running tool
//! notice cancellation mid-call rather than only between steps.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::message::Message;
use crate::stream::ToolStreamWriter;

/// Per-call context available to tools during execution.
///
/// Built by the tool executor before each call; carries enough of the run's
/// state that a tool never needs a back-reference into the step loop.
#[derive(Clone)]
pub struct ToolContext {
    /// Recent messages in the current conversation (current step's state.messages).
    pub recent_messages: Vec<Message>,

    /// Optional writer for emitting custom streaming events during the call.
    pub stream_writer: Option<ToolStreamWriter>,

    /// Thread/session id for the current run, when the caller supplied one.
    pub thread_id: Option<String>,

    /// User id for the current run, for multi-tenant scoping.
    pub user_id: Option<String>,

    /// Root directory tools are confined to (e.g. the file tools refuse to
    /// resolve any path outside of it).
    pub working_directory: Arc<PathBuf>,

    /// Cancellation flag for the owning run.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    pub fn new(working_directory: Arc<PathBuf>, cancellation: CancellationToken) -> Self {
        Self {
            recent_messages: Vec::new(),
            stream_writer: None,
            thread_id: None,
            user_id: None,
            working_directory,
            cancellation,
        }
    }

    pub fn with_stream_writer(mut self, writer: ToolStreamWriter) -> Self {
        self.stream_writer = Some(writer);
        self
    }

    pub fn with_recent_messages(mut self, messages: Vec<Message>) -> Self {
        self.recent_messages = messages;
        self
    }

    /// Emits a custom streaming event if a writer is available. Returns
    /// `true` if the event was sent.
    pub fn emit_custom(&self, value: serde_json::Value) -> bool {
        self.stream_writer
            .as_ref()
            .map(|w| w.emit_custom(value))
            .unwrap_or(false)
    }
}
