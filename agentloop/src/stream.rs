//! Internal event model produced by the step loop.
//!
//! Adapted from loom's `stream` module, cut down to the event shapes the
//! streaming dispatcher actually needs to translate into SSE: message
//! deltas, tool lifecycle, usage, and a custom escape hatch. The type-erased
//! `ToolStreamWriter` pattern is kept verbatim since it is how a `Tool`
//! implementation emits progress without depending on the dispatcher.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::message::{Message, ToolCall, ToolResult};

/// One incremental token chunk from a streaming LLM call.
#[derive(Debug, Clone, Default)]
pub struct MessageChunk {
    pub content: String,
}

/// One increment of agent activity, emitted by the step loop as the run
/// progresses. The streaming dispatcher (`openai_sse`, SSE encoder) consumes
/// these and re-encodes them for the wire.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The assistant has started producing a new message.
    MessageStart,
    /// An incremental chunk of assistant text.
    MessageDelta(String),
    /// The assistant's message is complete.
    MessageEnd(Message),
    /// A tool call was dispatched.
    ToolCallStart(ToolCall),
    /// A tool call finished.
    ToolCallEnd(ToolResult),
    /// Token usage for the turn.
    Usage { prompt_tokens: u32, completion_tokens: u32, total_tokens: u32 },
    /// Opaque, implementation-defined payload (e.g. a hook's injected message,
    /// a HOTL status line, approval-required notices).
    Custom(Value),
    /// The loop's terminal disposition, emitted exactly once before either
    /// `Error` (on a failing path) or `Done` (always, last).
    StopReason {
        reason: crate::run_manager::StopReason,
        error_type: Option<crate::error::ErrorType>,
    },
    /// Emitted between `StopReason` and `Done` on any error path.
    Error { message: String, error_type: crate::error::ErrorType },
    /// Terminal event: the run ended, successfully or not.
    Done { error: Option<String> },
}

/// Type-erased sink a `Tool` implementation can use to emit [`StreamEvent::Custom`]
/// without depending on whatever transport is collecting events for this run.
#[derive(Clone)]
pub struct ToolStreamWriter {
    emit_fn: Arc<dyn Fn(Value) -> bool + Send + Sync>,
}

impl ToolStreamWriter {
    pub fn new(emit_fn: impl Fn(Value) -> bool + Send + Sync + 'static) -> Self {
        Self { emit_fn: Arc::new(emit_fn) }
    }

    /// A writer that silently drops every event; used when no one is listening.
    pub fn noop() -> Self {
        Self::new(|_| true)
    }

    pub fn emit_custom(&self, value: Value) -> bool {
        (self.emit_fn)(value)
    }
}

impl fmt::Debug for ToolStreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolStreamWriter").finish_non_exhaustive()
    }
}

impl Default for ToolStreamWriter {
    fn default() -> Self {
        Self::noop()
    }
}

/// Sink the step loop writes [`StreamEvent`]s to. A thin wrapper over an
/// `mpsc` sender so the step loop itself stays transport-agnostic; the
/// server wires this to an SSE response, tests wire it to a `Vec`.
#[derive(Clone)]
pub struct StreamWriter {
    sender: tokio::sync::mpsc::UnboundedSender<StreamEvent>,
}

impl StreamWriter {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { sender }
    }

    /// Emits an event; silently drops it if the receiver has gone away
    /// (client disconnected mid-run, which is not itself an error).
    pub fn emit(&self, event: StreamEvent) {
        let _ = self.sender.send(event);
    }

    /// Builds a `ToolStreamWriter` that forwards through this writer's channel,
    /// wrapping every value in `StreamEvent::Custom`.
    pub fn as_tool_writer(&self) -> ToolStreamWriter {
        let sender = self.sender.clone();
        ToolStreamWriter::new(move |value| sender.send(StreamEvent::Custom(value)).is_ok())
    }
}
