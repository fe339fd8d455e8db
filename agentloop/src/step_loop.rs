//! Agent Step Loop: drives one user turn through repeated
//! request/extract/execute-tool/respond cycles until a terminal text
//! reply, the step budget, cancellation, or a fatal error ends it.
//!
//! Adapted from the teacher's ReAct think/act/observe shape (`agent/react`),
//! generalized from its fixed graph-node wiring into a single function that
//! threads [`AgentState`] through hooks, the LLM adapter, and the tool
//! executor in the order this spec's algorithm names.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::cancellation::CancellationToken;
use crate::error::{AgentError, ErrorType};
use crate::hooks::{HookEvent, HooksManager};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::run_manager::StopReason;
use crate::state::AgentState;
use crate::stream::{StreamEvent, StreamWriter};
use crate::tool_executor::ToolExecutor;
use crate::tools::ToolRegistry;

/// Tunables for one step loop invocation.
#[derive(Debug, Clone)]
pub struct StepLoopConfig {
    pub max_steps: usize,
    pub max_retries: usize,
    pub retry_delay: Duration,
    /// Forces `additionalProperties: false` and every property required in
    /// emitted tool schemas, per the registry's strict-mode contract.
    pub strict_schema: bool,
}

impl Default for StepLoopConfig {
    fn default() -> Self {
        Self { max_steps: 50, max_retries: 2, retry_delay: Duration::from_millis(500), strict_schema: true }
    }
}

/// Per-run identity threaded into hook payloads and tool contexts.
#[derive(Debug, Clone)]
pub struct StepLoopInputs {
    pub agent_id: String,
    pub messages: Vec<Message>,
}

/// Outcome of one full loop invocation.
pub struct StepOutcome {
    pub state: AgentState,
    pub stop_reason: StopReason,
    pub error: Option<AgentError>,
}

/// Drives the request/tool-execute cycle for one run.
pub struct StepLoop<L: LlmClient> {
    llm: Arc<L>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    hooks: Arc<HooksManager>,
    config: StepLoopConfig,
}

impl<L: LlmClient> StepLoop<L> {
    pub fn new(llm: Arc<L>, registry: Arc<ToolRegistry>, executor: ToolExecutor, hooks: Arc<HooksManager>, config: StepLoopConfig) -> Self {
        Self { llm, registry, executor, hooks, config }
    }

    /// Assembles the request payload without issuing it: current message
    /// history plus the registry's tool schemas. Used by callers that want
    /// to inspect or log what would be sent before running the loop.
    pub fn build_request(&self, inputs: &StepLoopInputs) -> (Vec<Message>, Vec<crate::tool_source::ToolSpec>) {
        (inputs.messages.clone(), self.registry.emit_schemas(self.config.strict_schema))
    }

    /// Runs the loop to completion, discarding intermediate events.
    pub async fn step(&self, inputs: StepLoopInputs, cancellation: CancellationToken) -> StepOutcome {
        self.run(inputs, cancellation, None).await
    }

    /// Runs the loop, emitting [`StreamEvent`]s to `writer` as it progresses.
    pub async fn stream(&self, inputs: StepLoopInputs, cancellation: CancellationToken, writer: StreamWriter) -> StepOutcome {
        self.run(inputs, cancellation, Some(&writer)).await
    }

    async fn run(&self, inputs: StepLoopInputs, cancellation: CancellationToken, writer: Option<&StreamWriter>) -> StepOutcome {
        self.hooks.run_hooks(HookEvent::OnLoopStart, &json!({"agent_id": inputs.agent_id})).await;

        let mut state = AgentState::new(inputs.messages);

        if let Some(outcome) = self.apply_prompt_submit_gate(&inputs.agent_id, &mut state).await {
            self.finish(&inputs.agent_id, &state, writer, &outcome).await;
            return outcome;
        }

        let outcome = loop {
            match self.one_step(&inputs.agent_id, &mut state, &cancellation, writer).await {
                StepResult::Terminal(outcome) => break outcome,
                StepResult::Continue => {}
            }
        };

        self.finish(&inputs.agent_id, &state, writer, &outcome).await;
        outcome
    }

    async fn apply_prompt_submit_gate(&self, agent_id: &str, state: &mut AgentState) -> Option<StepOutcome> {
        let last_user = state.messages.iter().rev().find_map(|m| match m {
            Message::User { content } => Some(content.clone()),
            _ => None,
        });
        let result = self
            .hooks
            .run_hooks(HookEvent::OnPromptSubmit, &json!({"agent_id": agent_id, "message": last_user}))
            .await;

        if result.block {
            let message = result.error.clone().unwrap_or_else(|| "blocked by on_prompt_submit hook".to_string());
            return Some(StepOutcome { state: state.clone(), stop_reason: StopReason::Refused, error: Some(AgentError::HookBlocked(message)) });
        }

        if let Some(inject) = result.inject_message {
            if let Some(Message::User { content }) = state.messages.iter_mut().rev().find(|m| matches!(m, Message::User { .. })) {
                content.push_str(&format!("\n<user-prompt-submit-hook>{inject}</user-prompt-submit-hook>"));
            }
        }
        None
    }

    async fn one_step(&self, agent_id: &str, state: &mut AgentState, cancellation: &CancellationToken, writer: Option<&StreamWriter>) -> StepResult {
        let tools = self.registry.emit_schemas(self.config.strict_schema);

        let response = match self.invoke_with_retry(&state.messages, &tools).await {
            Ok(r) => r,
            Err(e) => return StepResult::Terminal(self.error_outcome(state, e)),
        };

        if let Some(usage) = &response.usage {
            if let Some(w) = writer {
                w.emit(StreamEvent::Usage { prompt_tokens: usage.prompt_tokens, completion_tokens: usage.completion_tokens, total_tokens: usage.total_tokens });
            }
        }

        if response.tool_calls.is_empty() {
            let message = Message::assistant(response.content.clone());
            if let Some(w) = writer {
                w.emit(StreamEvent::MessageStart);
                w.emit(StreamEvent::MessageDelta(response.content.clone()));
                w.emit(StreamEvent::MessageEnd(message.clone()));
            }
            state.messages.push(message);
            return StepResult::Terminal(StepOutcome { state: state.clone(), stop_reason: StopReason::EndTurn, error: None });
        }

        state.pending_tool_calls = response.tool_calls.clone();
        state.messages.push(Message::assistant_with_tool_calls(response.content.clone(), response.tool_calls.clone()));

        let call = state.pending_tool_calls[0].clone();
        let result = self.execute_one_tool_call(agent_id, &call, cancellation, writer).await;
        state.tool_results.push(result.clone());
        state.messages.push(Message::tool(result.call_id.clone(), result.output.clone()));

        state.step_count += 1;
        if state.step_count >= self.config.max_steps {
            return StepResult::Terminal(StepOutcome { state: state.clone(), stop_reason: StopReason::MaxSteps, error: Some(AgentError::StepBudgetExhausted(state.step_count)) });
        }

        if cancellation.is_cancelled() {
            return StepResult::Terminal(StepOutcome { state: state.clone(), stop_reason: StopReason::Cancelled, error: None });
        }

        StepResult::Continue
    }

    async fn execute_one_tool_call(
        &self,
        agent_id: &str,
        call: &crate::message::ToolCall,
        cancellation: &CancellationToken,
        writer: Option<&StreamWriter>,
    ) -> crate::message::ToolResult {
        if let Some(w) = writer {
            w.emit(StreamEvent::ToolCallStart(call.clone()));
        }

        let start_gate = self
            .hooks
            .run_hooks(
                HookEvent::OnToolStart,
                &json!({"agent_id": agent_id, "tool_name": call.name, "tool_call_id": call.call_id, "arguments": call.arguments}),
            )
            .await;

        let result = if start_gate.block {
            let message = start_gate.error.clone().unwrap_or_else(|| format!("{} blocked by on_tool_start hook", call.name));
            crate::message::ToolResult::error(call.call_id.as_str(), message)
        } else {
            self.executor.execute(&call.call_id, &call.name, &call.arguments, cancellation.clone()).await
        };

        self.hooks
            .run_hooks(
                HookEvent::OnToolEnd,
                &json!({
                    "agent_id": agent_id,
                    "tool_name": call.name,
                    "tool_call_id": call.call_id,
                    "output": result.output,
                    "is_error": result.is_error,
                }),
            )
            .await;

        if let Some(w) = writer {
            w.emit(StreamEvent::ToolCallEnd(result.clone()));
        }

        result
    }

    async fn invoke_with_retry(&self, messages: &[Message], tools: &[crate::tool_source::ToolSpec]) -> Result<crate::llm::LlmResponse, crate::llm::LlmError> {
        let mut attempt = 0;
        loop {
            match self.llm.invoke(messages, tools).await {
                Ok(r) => return Ok(r),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "retrying transient llm failure");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn error_outcome(&self, state: &AgentState, llm_error: crate::llm::LlmError) -> StepOutcome {
        let error = AgentError::Llm(llm_error);
        StepOutcome { state: state.clone(), stop_reason: StopReason::LlmApiError, error: Some(error) }
    }

    /// Fires `on_message` with the final text then `on_loop_end`, and emits
    /// the terminal three-line event shape this spec's "Terminal guarantees"
    /// paragraph requires.
    async fn finish(&self, agent_id: &str, state: &AgentState, writer: Option<&StreamWriter>, outcome: &StepOutcome) {
        let final_text = state.last_assistant_reply().unwrap_or_default().to_string();
        self.hooks.run_hooks(HookEvent::OnMessage, &json!({"agent_id": agent_id, "message": final_text})).await;
        self.hooks.run_hooks(HookEvent::OnLoopEnd, &json!({"agent_id": agent_id})).await;

        let Some(w) = writer else { return };

        let error_type = outcome.error.as_ref().map(|e| e.error_type());
        w.emit(StreamEvent::StopReason { reason: outcome.stop_reason, error_type });
        if let Some(error) = &outcome.error {
            w.emit(StreamEvent::Error { message: error.to_string(), error_type: error.error_type() });
            w.emit(StreamEvent::Done { error: Some(error.to_string()) });
        } else {
            w.emit(StreamEvent::Done { error: None });
        }
    }
}

enum StepResult {
    Continue,
    Terminal(StepOutcome),
}

/// Synthesizes the `stream_incomplete` terminal shape this spec requires
/// when an upstream stream ends with neither a stop-reason nor an error
/// event already emitted. Exposed for streaming-dispatcher callers that
/// drive `StepLoop::stream` against a transport that can die mid-flight.
pub fn stream_incomplete_outcome(state: AgentState) -> StepOutcome {
    StepOutcome { state, stop_reason: StopReason::Error, error: Some(AgentError::StreamIncomplete) }
}

pub fn error_type_of(error: &AgentError) -> ErrorType {
    error.error_type()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HooksConfig;
    use crate::llm::{LlmResponse, LlmUsage, MockLlm};
    use crate::metrics::InMemoryMetrics;

    fn loop_with(llm: MockLlm, registry: ToolRegistry) -> StepLoop<MockLlm> {
        let dir = std::sync::Arc::new(std::path::PathBuf::from("/tmp"));
        let registry = Arc::new(registry);
        let metrics = Arc::new(InMemoryMetrics::default());
        let executor = ToolExecutor::new(registry.clone(), metrics, dir);
        let hooks = Arc::new(HooksManager::new(HooksConfig::default()));
        StepLoop::new(Arc::new(llm), registry, executor, hooks, StepLoopConfig::default())
    }

    #[tokio::test]
    async fn terminal_text_response_ends_loop_with_end_turn() {
        let step_loop = loop_with(MockLlm::fixed_text("hello there"), ToolRegistry::new());
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
        let outcome = step_loop.step(inputs, CancellationToken::new()).await;
        assert_eq!(outcome.stop_reason, StopReason::EndTurn);
        assert_eq!(outcome.state.last_assistant_reply(), Some("hello there"));
    }

    #[tokio::test]
    async fn cancellation_before_budget_exhausted_stops_loop() {
        let llm = MockLlm::calling_tool("read_file", "{}");
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(crate::tools::ReadFileTool::new(Arc::new(std::path::PathBuf::from("/tmp")))));
        let step_loop = loop_with(llm, registry);
        let token = CancellationToken::new();
        token.cancel();
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("read it")] };
        let outcome = step_loop.step(inputs, token).await;
        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn step_budget_exhaustion_stops_with_max_steps() {
        let llm = MockLlm::calling_tool("read_file", "{}");
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(crate::tools::ReadFileTool::new(Arc::new(std::path::PathBuf::from("/tmp")))));
        let mut step_loop = loop_with(llm, registry);
        step_loop.config.max_steps = 1;
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("read it")] };
        let outcome = step_loop.step(inputs, CancellationToken::new()).await;
        assert_eq!(outcome.stop_reason, StopReason::MaxSteps);
        assert!(matches!(outcome.error, Some(AgentError::StepBudgetExhausted(_))));
    }

    #[tokio::test]
    async fn prompt_submit_block_ends_loop_with_refused() {
        let mut config = HooksConfig::default();
        config.on_prompt_submit.push(crate::hooks::ShellHook { command: "echo blocked 1>&2; exit 1".to_string() });
        let registry = Arc::new(ToolRegistry::new());
        let metrics = Arc::new(InMemoryMetrics::default());
        let executor = ToolExecutor::new(registry.clone(), metrics, Arc::new(std::path::PathBuf::from("/tmp")));
        let hooks = Arc::new(HooksManager::new(config));
        let step_loop = StepLoop::new(Arc::new(MockLlm::fixed_text("unused")), registry, executor, hooks, StepLoopConfig::default());
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
        let outcome = step_loop.step(inputs, CancellationToken::new()).await;
        assert_eq!(outcome.stop_reason, StopReason::Refused);
    }

    #[tokio::test]
    async fn llm_error_maps_to_llm_api_error_stop_reason() {
        let llm = MockLlm::new(vec![]);
        let step_loop = loop_with(llm, ToolRegistry::new());
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
        let outcome = step_loop.step(inputs, CancellationToken::new()).await;
        assert_eq!(outcome.stop_reason, StopReason::LlmApiError);
        assert_eq!(outcome.error.unwrap().error_type(), ErrorType::LlmError);
    }

    #[tokio::test]
    async fn streaming_run_emits_stop_reason_then_done() {
        let step_loop = loop_with(MockLlm::fixed_text("done"), ToolRegistry::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let writer = StreamWriter::new(tx);
        let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
        step_loop.stream(inputs, CancellationToken::new(), writer).await;

        let mut saw_stop_reason = false;
        let mut saw_done = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                StreamEvent::StopReason { reason, .. } => {
                    assert_eq!(reason, StopReason::EndTurn);
                    saw_stop_reason = true;
                }
                StreamEvent::Done { error } => {
                    assert!(error.is_none());
                    saw_done = true;
                }
                _ => {}
            }
        }
        assert!(saw_stop_reason && saw_done);
    }
}
