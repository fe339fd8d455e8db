//! End-to-end step-loop scenarios: a user turn driven through `StepLoop`
//! end to end, asserting on the emitted `StreamEvent` sequence and the
//! resulting message history rather than on any single component in
//! isolation.

use std::sync::Arc;

use agentloop::hooks::{HooksConfig, HooksManager};
use agentloop::llm::MockLlm;
use agentloop::message::Message;
use agentloop::metrics::InMemoryMetrics;
use agentloop::run_manager::StopReason;
use agentloop::stream::{StreamEvent, StreamWriter};
use agentloop::tools::{ReadFileTool, ToolRegistry};
use agentloop::tool_executor::ToolExecutor;
use agentloop::{CancellationToken, StepLoop, StepLoopConfig, StepLoopInputs};

fn step_loop_with(llm: MockLlm, registry: ToolRegistry, dir: &std::path::Path) -> StepLoop<MockLlm> {
    let registry = Arc::new(registry);
    let metrics = Arc::new(InMemoryMetrics::default());
    let executor = ToolExecutor::new(registry.clone(), metrics, Arc::new(dir.to_path_buf()));
    let hooks = Arc::new(HooksManager::new(HooksConfig::default()));
    StepLoop::new(Arc::new(llm), registry, executor, hooks, StepLoopConfig::default())
}

async fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Scenario (a): a text-only reply ends the run with `end_turn` and the
/// last two emitted events are `stop_reason` then `[DONE]`.
#[tokio::test]
async fn greeting_ends_turn_and_terminates_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let step_loop = step_loop_with(MockLlm::fixed_text("Hello!"), ToolRegistry::new(), dir.path());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let writer = StreamWriter::new(tx);

    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("Hello")] };
    let outcome = step_loop.stream(inputs, CancellationToken::new(), writer).await;

    assert_eq!(outcome.stop_reason, StopReason::EndTurn);
    assert!(outcome.error.is_none());

    let events = drain(&mut rx).await;
    let (rest, last_two) = events.split_at(events.len() - 2);
    assert!(rest.iter().any(|e| matches!(e, StreamEvent::MessageEnd(Message::Assistant { content, .. }) if content == "Hello!")));
    assert!(matches!(last_two[0], StreamEvent::StopReason { reason: StopReason::EndTurn, error_type: None }));
    assert!(matches!(last_two[1], StreamEvent::Done { error: None }));
}

/// Scenario (b): one tool call, then a text summary. The tool's return is
/// folded back into history as exactly one entry keyed by the call id
/// (property 7, "approval pairing", adapted to this runtime's four-role
/// `Message` model where `Message::Tool` carries that entry).
#[tokio::test]
async fn single_tool_call_is_paired_with_exactly_one_return_entry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), "file contents").unwrap();

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(Arc::new(dir.path().to_path_buf()))));

    let llm = MockLlm::new(vec![
        agentloop::llm::LlmResponse {
            content: String::new(),
            tool_calls: vec![agentloop::message::ToolCall {
                call_id: "call_1".to_string(),
                name: "read_file".to_string(),
                arguments: serde_json::json!({"path": "x.txt"}).to_string(),
            }],
            usage: None,
            reasoning: None,
        },
        agentloop::llm::LlmResponse { content: "Here it is.".to_string(), tool_calls: vec![], usage: None, reasoning: None },
    ]);

    let step_loop = step_loop_with(llm, registry, dir.path());
    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("read x.txt")] };
    let outcome = step_loop.step(inputs, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::EndTurn);

    let tool_entries: Vec<_> = outcome
        .state
        .messages
        .iter()
        .filter_map(|m| match m {
            Message::Tool { tool_call_id, content } => Some((tool_call_id.as_str(), content.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(tool_entries.len(), 1);
    assert_eq!(tool_entries[0].0, "call_1");
    assert!(tool_entries[0].1.contains("file contents"));
}

/// Scenario (c): cancellation observed between steps stops the loop without
/// an error frame.
#[tokio::test]
async fn cancellation_mid_run_terminates_without_an_error_frame() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), "y").unwrap();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(Arc::new(dir.path().to_path_buf()))));

    let llm = MockLlm::calling_tool("read_file", serde_json::json!({"path": "x.txt"}).to_string());
    let step_loop = step_loop_with(llm, registry, dir.path());
    let token = CancellationToken::new();
    token.cancel();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let writer = StreamWriter::new(tx);
    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("read it")] };
    let outcome = step_loop.stream(inputs, token, writer).await;

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert!(outcome.error.is_none());

    let events = drain(&mut rx).await;
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));
    assert!(matches!(events.last(), Some(StreamEvent::Done { error: None })));
}

/// Property 1 ("stream terminality") on a failing path: the only `[DONE]`
/// is last, preceded by exactly a `stop_reason` frame then an `error` frame.
#[tokio::test]
async fn stream_terminality_holds_on_the_llm_error_path() {
    let dir = tempfile::tempdir().unwrap();
    let step_loop = step_loop_with(MockLlm::new(vec![]), ToolRegistry::new(), dir.path());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let writer = StreamWriter::new(tx);
    let inputs = StepLoopInputs { agent_id: "a1".into(), messages: vec![Message::user("hi")] };
    step_loop.stream(inputs, CancellationToken::new(), writer).await;

    let events = drain(&mut rx).await;
    let done_positions: Vec<_> = events.iter().enumerate().filter(|(_, e)| matches!(e, StreamEvent::Done { .. })).collect();
    assert_eq!(done_positions.len(), 1, "exactly one [DONE]");
    let (done_idx, _) = done_positions[0];
    assert_eq!(done_idx, events.len() - 1, "[DONE] is the last event");
    assert!(matches!(events[done_idx - 1], StreamEvent::Error { .. }));
    assert!(matches!(events[done_idx - 2], StreamEvent::StopReason { .. }));
}
