//! # agentloop
//!
//! A stateful agent execution runtime: one LLM step loop, client-side tool
//! execution, an SSE streaming dispatcher, a hooks pipeline, a human-out-of-
//! the-loop controller, and a run lifecycle manager, wired together the way
//! the teacher this crate is adapted from wires its ReAct graph, tool
//! sources, and checkpointing — but generalized to this runtime's own
//! component boundaries rather than a fixed graph shape.
//!
//! ## Main modules
//!
//! - [`step_loop`]: [`step_loop::StepLoop`] — the request/tool-execute cycle for one run.
//! - [`tool_executor`]: [`tool_executor::ToolExecutor`] — runs one tool call with timing, truncation, metrics.
//! - [`tools`]: [`tools::Tool`], [`tools::ToolRegistry`] — concrete tools and the registry holding them.
//! - [`tool_source`]: [`tool_source::ToolSpec`], [`tool_source::ToolContext`] — tool description and invocation types.
//! - [`llm`]: [`llm::LlmClient`] trait, [`llm::MockLlm`], [`llm::ChatOpenAI`].
//! - [`hooks`]: [`hooks::HooksManager`] — the six-event hooks pipeline.
//! - [`hotl`]: [`hotl::HotlController`] — durable self-referential loop state.
//! - [`run_manager`]: [`run_manager::RunManager`] — run lifecycle state machine.
//! - [`event_bus`]: [`event_bus::EventBus`] — replay-from-start pub/sub for background runs.
//! - [`persistence`]: [`persistence::ConversationStore`] — narrow message-history trait.
//! - [`stream`]: [`stream::StreamEvent`], [`stream::StreamWriter`] — the step loop's internal event model.
//! - [`cancellation`]: [`cancellation::CancellationToken`] — the per-run cancellation fabric.
//! - [`metrics`]: [`metrics::Metrics`] — duration/counter observation seam.
//! - [`message`]: [`message::Message`], [`message::ToolCall`], [`message::ToolResult`].
//! - [`state`]: [`state::AgentState`] — state threaded through the step loop.
//! - [`error`]: [`error::AgentError`], [`error::RuntimeError`], [`error::ErrorType`].

pub mod cancellation;
pub mod error;
pub mod event_bus;
pub mod hooks;
pub mod hotl;
pub mod llm;
pub mod message;
pub mod metrics;
pub mod persistence;
pub mod run_manager;
pub mod state;
pub mod step_loop;
pub mod stream;
pub mod tool_executor;
pub mod tool_source;
pub mod tools;

pub use cancellation::CancellationToken;
pub use error::{AgentError, ErrorType, RuntimeError};
pub use event_bus::{EventBus, EventBusError, InProcessEventBus, NoOpEventBus};
pub use hooks::{HookEvent, HookResult, HooksConfig, HooksManager};
pub use hotl::{HotlController, HotlState, HotlStatus};
pub use llm::{ChatOpenAI, LlmClient, LlmError, LlmResponse, LlmUsage, MockLlm};
pub use message::{Message, ToolCall, ToolResult};
pub use metrics::{InMemoryMetrics, Metrics, TracingMetrics};
pub use persistence::{ConversationStore, ConversationStoreError, InMemoryConversationStore, NoOpConversationStore};
pub use run_manager::{Run, RunManager, RunManagerError, RunStatus, RunStore, RunUpdate, StopReason};
pub use state::AgentState;
pub use step_loop::{StepLoop, StepLoopConfig, StepLoopInputs, StepOutcome};
pub use stream::{MessageChunk, StreamEvent, StreamWriter, ToolStreamWriter};
pub use tool_executor::ToolExecutor;
pub use tool_source::{ToolCallContent, ToolContext, ToolKind, ToolSourceError, ToolSpec};
pub use tools::{ReadFileTool, Tool, ToolRegistry, TodoItem, TodoReadTool, TodoStatus, TodoWriteTool, WriteFileTool};
