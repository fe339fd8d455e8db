//! Scenario (d) (LLM rate-limit exhausts retries), property 6 (step budget
//! honored: at most `max_steps + 1` LLM requests), and property 10 (a
//! blocking `on_prompt_submit` hook issues zero LLM requests).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use agentloop::error::ErrorType;
use agentloop::hooks::{HooksConfig, HooksManager, ShellHook};
use agentloop::llm::{LlmClient, LlmError, LlmResponse};
use agentloop::message::{Message, ToolCall};
use agentloop::metrics::InMemoryMetrics;
use agentloop::run_manager::StopReason;
use agentloop::tool_executor::ToolExecutor;
use agentloop::tools::{ReadFileTool, ToolRegistry};
use agentloop::tool_source::ToolSpec;
use agentloop::{CancellationToken, StepLoop, StepLoopConfig, StepLoopInputs};

/// Always fails with a retryable rate-limit error, counting every call.
struct AlwaysRateLimited {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for AlwaysRateLimited {
    async fn invoke(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::RateLimited("slow down".to_string()))
    }
}

/// Always proposes the same tool call, never a terminal text reply, so the
/// loop only stops via the step budget.
struct AlwaysCallsTool {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for AlwaysCallsTool {
    async fn invoke(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: String::new(),
            tool_calls: vec![ToolCall { call_id: "c".to_string(), name: "read_file".to_string(), arguments: "{}".to_string() }],
            usage: None,
            reasoning: None,
        })
    }
}

fn registry_with_read_file(dir: &std::path::Path) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(Arc::new(dir.to_path_buf()))));
    registry
}

#[tokio::test]
async fn rate_limit_exhausts_retries_then_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(AlwaysRateLimited { calls: AtomicUsize::new(0) });
    let registry = Arc::new(ToolRegistry::new());
    let metrics = Arc::new(InMemoryMetrics::default());
    let executor = ToolExecutor::new(registry.clone(), metrics, Arc::new(dir.path().to_path_buf()));
    let hooks = Arc::new(HooksManager::new(HooksConfig::default()));
    let config = StepLoopConfig { max_retries: 2, retry_delay: std::time::Duration::from_millis(1), ..StepLoopConfig::default() };
    let step_loop = StepLoop::new(llm.clone(), registry, executor, hooks, config);

    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
    let outcome = step_loop.step(inputs, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::LlmApiError);
    assert_eq!(outcome.error.unwrap().error_type(), ErrorType::LlmRateLimit);
    // One initial attempt plus `max_retries` retries.
    assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn step_budget_issues_at_most_max_steps_plus_one_requests() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(AlwaysCallsTool { calls: AtomicUsize::new(0) });
    let registry = Arc::new(registry_with_read_file(dir.path()));
    let metrics = Arc::new(InMemoryMetrics::default());
    let executor = ToolExecutor::new(registry.clone(), metrics, Arc::new(dir.path().to_path_buf()));
    let hooks = Arc::new(HooksManager::new(HooksConfig::default()));
    let max_steps = 3;
    let config = StepLoopConfig { max_steps, ..StepLoopConfig::default() };
    let step_loop = StepLoop::new(llm.clone(), registry, executor, hooks, config);

    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("keep going")] };
    let outcome = step_loop.step(inputs, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::MaxSteps);
    assert!(llm.calls.load(Ordering::SeqCst) <= max_steps + 1);
}

#[tokio::test]
async fn blocking_prompt_submit_hook_issues_zero_llm_requests() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(AlwaysCallsTool { calls: AtomicUsize::new(0) });
    let registry = Arc::new(ToolRegistry::new());
    let metrics = Arc::new(InMemoryMetrics::default());
    let executor = ToolExecutor::new(registry.clone(), metrics, Arc::new(dir.path().to_path_buf()));
    let mut config = HooksConfig::default();
    config.on_prompt_submit.push(ShellHook { command: "echo denied 1>&2; exit 1".to_string() });
    let hooks = Arc::new(HooksManager::new(config));
    let step_loop = StepLoop::new(llm.clone(), registry, executor, hooks, StepLoopConfig::default());

    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
    let outcome = step_loop.step(inputs, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Refused);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}
