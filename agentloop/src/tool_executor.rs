//! Tool Executor: runs a single tool call with cancellation, timing, output
//! truncation, and metrics, and never lets a tool's failure escape as a
//! thrown error — every outcome, including a malformed call, becomes a
//! [`crate::message::ToolResult`].

use std::sync::Arc;
use std::time::Instant;

use crate::cancellation::CancellationToken;
use crate::message::ToolResult;
use crate::metrics::Metrics;
use crate::tool_source::ToolContext;
use crate::tools::ToolRegistry;

/// Marker inserted when a tool's output is truncated, naming both lengths so
/// a reader (human or model) knows how much was cut.
fn truncation_marker(original_len: usize, ceiling: usize) -> String {
    format!("\n\n... [output truncated: {original_len} chars, limit {ceiling}]")
}

fn truncate(output: String, ceiling: usize) -> String {
    if output.len() <= ceiling {
        return output;
    }
    let marker = truncation_marker(output.len(), ceiling);
    let mut truncated: String = output.chars().take(ceiling).collect();
    truncated.push_str(&marker);
    truncated
}

/// Parses a tool call's raw arguments, which the model may have emitted as
/// either a JSON object or a JSON-encoded string of one.
fn parse_args(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| format!("malformed arguments: {e}"))
}

/// Executes named tools against a fixed [`ToolRegistry`], recording
/// per-call duration and outcome metrics.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    metrics: Arc<dyn Metrics>,
    working_directory: Arc<std::path::PathBuf>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, metrics: Arc<dyn Metrics>, working_directory: Arc<std::path::PathBuf>) -> Self {
        Self { registry, metrics, working_directory }
    }

    /// Executes `name(args)`, where `args` is the tool call's raw argument
    /// string (JSON object or JSON-encoded string, per the model's emission).
    /// Always returns a [`ToolResult`]; never a thrown error.
    pub async fn execute(&self, call_id: &str, name: &str, raw_args: &str, cancellation: CancellationToken) -> ToolResult {
        let tags = vec![("tool.name", name.to_string())];

        let Some(tool) = self.registry.get(name) else {
            self.metrics.incr_counter("tool.calls.error", &tags);
            return ToolResult::error(call_id, format!("unknown tool: {name}"));
        };

        let args = match parse_args(raw_args) {
            Ok(v) => v,
            Err(msg) => {
                self.metrics.incr_counter("tool.calls.error", &tags);
                return ToolResult::error(call_id, msg);
            }
        };

        let ctx = ToolContext::new(self.working_directory.clone(), cancellation);
        let max_output_len = tool.spec().max_output_len;

        let started = Instant::now();
        let outcome = tool.call(args, &ctx).await;
        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.record_duration("tool.call.duration", &tags, elapsed);

        match outcome {
            Ok(content) => {
                self.metrics.incr_counter("tool.calls.success", &tags);
                ToolResult::ok(call_id, truncate(content.text, max_output_len))
            }
            Err(crate::tool_source::ToolSourceError::Cancelled) => {
                self.metrics.incr_counter("tool.calls.error", &tags);
                ToolResult::error(call_id, format!("{name} was cancelled"))
            }
            Err(e) => {
                self.metrics.incr_counter("tool.calls.error", &tags);
                ToolResult::error(call_id, e.to_string())
            }
        }
    }
}
