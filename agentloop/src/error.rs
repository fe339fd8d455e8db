//! Error taxonomy for the agent runtime.
//!
//! Each component boundary (LLM transport, tool execution, hooks, HOTL, run
//! lifecycle) has its own `thiserror` enum; [`RuntimeError`] is the umbrella
//! type returned from the step loop and the HTTP layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error classification surfaced to clients as the SSE error payload's
/// `error_type` field. One mapping, rather than string literals scattered
/// across the step loop and the streaming dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    LlmTimeout,
    LlmRateLimit,
    LlmAuthentication,
    LlmError,
    InternalError,
    StreamIncomplete,
}

/// Error from a single step of the agent loop (think/act/observe).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm request failed: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error("tool execution failed: {0}")]
    Tool(#[from] crate::tool_source::ToolSourceError),

    #[error("hook blocked execution: {0}")]
    HookBlocked(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("step budget exhausted after {0} steps")]
    StepBudgetExhausted(usize),

    #[error("upstream ended without a terminal event")]
    StreamIncomplete,

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl AgentError {
    /// Maps this error onto the taxonomy's `error_type` for the SSE error
    /// payload. Cancellation is excluded: cancellation is cooperative
    /// observation, never an error, and never reaches this mapping.
    pub fn error_type(&self) -> ErrorType {
        match self {
            AgentError::Llm(crate::llm::LlmError::Timeout) => ErrorType::LlmTimeout,
            AgentError::Llm(crate::llm::LlmError::RateLimited(_)) => ErrorType::LlmRateLimit,
            AgentError::Llm(crate::llm::LlmError::Authentication(_)) => ErrorType::LlmAuthentication,
            AgentError::Llm(_) => ErrorType::LlmError,
            AgentError::StreamIncomplete => ErrorType::StreamIncomplete,
            AgentError::Cancelled => ErrorType::InternalError,
            _ => ErrorType::InternalError,
        }
    }
}

/// Umbrella error returned by the HTTP layer and the run manager.
///
/// Wraps every component error so a single `?` chain can cross module
/// boundaries without each caller matching on every variant.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Hotl(#[from] crate::hotl::HotlError),

    #[error(transparent)]
    Hooks(#[from] crate::hooks::HookError),

    #[error(transparent)]
    Run(#[from] crate::run_manager::RunManagerError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
