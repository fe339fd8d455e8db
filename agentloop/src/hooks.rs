//! Hooks pipeline: user-configured shell commands or native callbacks run at
//! fixed points in the step loop.
//!
//! Grounded directly in the original Python agent's `hooks.py`: six event
//! lists (`on_prompt_submit`, `on_tool_start`, `on_tool_end`, `on_message`,
//! `on_loop_start`, `on_loop_end`), sequential execution with first-block
//! short-circuit, a shell hook receiving its event payload as JSON on stdin
//! and returning either parsed-JSON `{inject_message, block}` or a plain-text
//! success. loom has no equivalent of this; it is new rather than adapted,
//! but written in loom's idiom (thiserror error enum, async-trait-free plain
//! async fns since there is no trait object boundary to cross here).

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Points in the step loop where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    OnPromptSubmit,
    OnToolStart,
    OnToolEnd,
    OnMessage,
    OnLoopStart,
    OnLoopEnd,
}

/// Outcome of running a single hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResult {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub inject_message: Option<String>,
    #[serde(default)]
    pub block: bool,
}

impl HookResult {
    fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: Some(output.into()), ..Default::default() }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }

    fn blocked(error: impl Into<String>, output: Option<String>) -> Self {
        Self { success: false, error: Some(error.into()), output, block: true, ..Default::default() }
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook command could not be spawned: {0}")]
    Spawn(String),
}

/// A single configured hook: a shell command invoked with the event payload
/// as JSON on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellHook {
    pub command: String,
}

/// Hooks registered per event, run in registration order.
#[derive(Debug, Clone, Default)]
pub struct HooksConfig {
    pub on_prompt_submit: Vec<ShellHook>,
    pub on_tool_start: Vec<ShellHook>,
    pub on_tool_end: Vec<ShellHook>,
    pub on_message: Vec<ShellHook>,
    pub on_loop_start: Vec<ShellHook>,
    pub on_loop_end: Vec<ShellHook>,
}

impl HooksConfig {
    fn hooks_for(&self, event: HookEvent) -> &[ShellHook] {
        match event {
            HookEvent::OnPromptSubmit => &self.on_prompt_submit,
            HookEvent::OnToolStart => &self.on_tool_start,
            HookEvent::OnToolEnd => &self.on_tool_end,
            HookEvent::OnMessage => &self.on_message,
            HookEvent::OnLoopStart => &self.on_loop_start,
            HookEvent::OnLoopEnd => &self.on_loop_end,
        }
    }
}

/// Runs configured hooks for each event.
pub struct HooksManager {
    config: HooksConfig,
    timeout: Duration,
}

impl HooksManager {
    pub fn new(config: HooksConfig) -> Self {
        Self { config, timeout: Duration::from_secs(30) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs every hook registered for `event` against `data`, in order.
    /// Stops at the first result with `block: true` and returns it;
    /// otherwise returns the last result (or a default success if no hooks
    /// are registered for this event).
    pub async fn run_hooks(&self, event: HookEvent, data: &serde_json::Value) -> HookResult {
        let hooks = self.config.hooks_for(event);
        let mut last = HookResult { success: true, ..Default::default() };
        for hook in hooks {
            let result = self.run_shell_hook(hook, data).await;
            if result.block {
                return result;
            }
            last = result;
        }
        last
    }

    async fn run_shell_hook(&self, hook: &ShellHook, data: &serde_json::Value) -> HookResult {
        let payload = match serde_json::to_vec(data) {
            Ok(p) => p,
            Err(e) => return HookResult::failed(format!("failed to encode hook payload: {e}")),
        };

        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(&hook.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => return HookResult::failed(format!("failed to spawn hook: {e}")),
        };

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload).await;
        }

        let wait = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let output = match wait {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return HookResult::failed(format!("hook process error: {e}")),
            Err(_) => {
                // Killing on timeout and the resulting block:true follows the spec's
                // explicit timeout contract, which is stricter than the Python
                // source (which reports success:false without blocking).
                return HookResult::blocked(format!("hook timed out after {:?}", self.timeout), None);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return HookResult::blocked(stderr, Some(stdout));
        }

        match serde_json::from_str::<serde_json::Value>(stdout.trim()) {
            Ok(serde_json::Value::Object(obj)) => HookResult {
                success: true,
                output: Some(stdout.clone()),
                error: None,
                inject_message: obj.get("inject_message").and_then(|v| v.as_str()).map(String::from),
                block: obj.get("block").and_then(|v| v.as_bool()).unwrap_or(false),
            },
            _ => HookResult::ok(stdout),
        }
    }
}
