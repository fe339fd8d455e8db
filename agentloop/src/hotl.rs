//! Human-out-the-loop controller: a durable, file-backed loop that re-injects
//! the same prompt at the end of each agent turn until a completion promise
//! appears in the output or an iteration cap is hit.
//!
//! Grounded on the original Python agent's `hotl/state.py` and `hotl/loop.py`:
//! the same frontmatter-plus-body state file layout (`.agentloop/hotl-loop.md`
//! under the working folder), the same loose, exception-swallowing parser (a
//! corrupt or hand-edited state file is treated as "no active loop" rather
//! than an error), and the same `<promise>...</promise>` tag matching with
//! whitespace normalization.

use std::path::{Path, PathBuf};

use thiserror::Error;

const STATE_FILE: &str = ".agentloop/hotl-loop.md";

#[derive(Debug, Error)]
pub enum HotlError {
    #[error("failed to read hotl state file: {0}")]
    Read(std::io::Error),
    #[error("failed to write hotl state file: {0}")]
    Write(std::io::Error),
}

/// Status of an active HOTL loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotlStatus {
    Running,
    Completed,
    Cancelled,
    MaxIterations,
}

/// State of an active HOTL loop, persisted as frontmatter + body text.
#[derive(Debug, Clone, PartialEq)]
pub struct HotlState {
    pub prompt: String,
    pub iteration: u32,
    /// 0 means unlimited.
    pub max_iterations: u32,
    pub completion_promise: Option<String>,
    pub status: HotlStatus,
}

impl HotlState {
    fn new(prompt: String, max_iterations: u32, completion_promise: Option<String>) -> Self {
        Self { prompt, iteration: 1, max_iterations, completion_promise, status: HotlStatus::Running }
    }

    /// Whether output contains a `<promise>` tag whose normalized text
    /// matches the configured completion promise.
    fn check_completion(&self, output: &str) -> bool {
        let Some(promise) = &self.completion_promise else { return false };
        let Some(start) = output.find("<promise>") else { return false };
        let Some(end_rel) = output[start..].find("</promise>") else { return false };
        let inner = &output[start + "<promise>".len()..start + end_rel];
        let normalized = inner.split_whitespace().collect::<Vec<_>>().join(" ");
        normalized == *promise
    }
}

/// What to do at the end of a loop turn, per [`HotlController::check_and_continue`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContinueAction {
    pub inject_message: String,
    pub iteration: u32,
    pub status_message: String,
}

fn state_path(working_folder: &Path) -> PathBuf {
    working_folder.join(STATE_FILE)
}

fn format_state_file(state: &HotlState) -> String {
    let promise = match &state.completion_promise {
        Some(p) => format!("\"{p}\""),
        None => "null".to_string(),
    };
    format!(
        "---\niteration: {}\nmax_iterations: {}\ncompletion_promise: {}\n---\n\n{}\n",
        state.iteration, state.max_iterations, promise, state.prompt
    )
}

/// Parses the frontmatter + body format. Any structural problem (missing
/// delimiters, malformed numbers) falls back to the field default rather than
/// erroring, matching the original's forgiving parse.
fn parse_state_file(content: &str) -> Option<HotlState> {
    let mut parts = content.splitn(3, "---");
    let _before = parts.next()?;
    let frontmatter = parts.next()?.trim();
    let prompt = parts.next()?.trim().to_string();

    let mut iteration = 1u32;
    let mut max_iterations = 0u32;
    let mut completion_promise = None;

    for line in frontmatter.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("iteration:") {
            if let Ok(v) = rest.trim().parse() {
                iteration = v;
            }
        } else if let Some(rest) = line.strip_prefix("max_iterations:") {
            if let Ok(v) = rest.trim().parse() {
                max_iterations = v;
            }
        } else if let Some(rest) = line.strip_prefix("completion_promise:") {
            let value = rest.trim();
            let value = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
            if !value.is_empty() && value != "null" {
                completion_promise = Some(value.to_string());
            }
        }
    }

    Some(HotlState { prompt, iteration, max_iterations, completion_promise, status: HotlStatus::Running })
}

/// Manages the durable HOTL loop for one working folder.
pub struct HotlController {
    working_folder: PathBuf,
}

impl HotlController {
    pub fn new(working_folder: impl Into<PathBuf>) -> Self {
        Self { working_folder: working_folder.into() }
    }

    pub fn load_state(&self) -> Option<HotlState> {
        let path = state_path(&self.working_folder);
        let content = std::fs::read_to_string(path).ok()?;
        parse_state_file(&content)
    }

    fn save_state(&self, state: &HotlState) -> Result<(), HotlError> {
        let path = state_path(&self.working_folder);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(HotlError::Write)?;
        }
        std::fs::write(path, format_state_file(state)).map_err(HotlError::Write)
    }

    fn clear_state(&self) -> bool {
        let path = state_path(&self.working_folder);
        if path.exists() {
            let _ = std::fs::remove_file(path);
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.load_state().is_some()
    }

    pub fn start(
        &self,
        prompt: impl Into<String>,
        max_iterations: u32,
        completion_promise: Option<String>,
    ) -> Result<HotlState, HotlError> {
        let state = HotlState::new(prompt.into(), max_iterations, completion_promise);
        self.save_state(&state)?;
        Ok(state)
    }

    /// Cancels the active loop, if any. Returns the iteration it was at.
    pub fn cancel(&self) -> Option<u32> {
        let state = self.load_state()?;
        self.clear_state();
        Some(state.iteration)
    }

    /// Called at the end of an agent turn with the turn's final text.
    /// Returns the next action to take if the loop should continue, or
    /// `None` if it just ended (promise matched, cap reached, or no loop
    /// was active).
    pub fn check_and_continue(&self, agent_output: &str) -> Option<ContinueAction> {
        let mut state = self.load_state()?;

        if state.check_completion(agent_output) {
            self.clear_state();
            return None;
        }

        if state.max_iterations > 0 && state.iteration >= state.max_iterations {
            self.clear_state();
            return None;
        }

        state.iteration += 1;
        let action = ContinueAction {
            inject_message: state.prompt.clone(),
            iteration: state.iteration,
            status_message: status_message(&state),
        };
        // Best-effort: if persisting the incremented iteration fails, the loop
        // still continues for this turn but the next turn will resume from the
        // last durably-saved iteration.
        let _ = self.save_state(&state);
        Some(action)
    }
}

fn status_message(state: &HotlState) -> String {
    let cap = if state.max_iterations > 0 { format!("/{}", state.max_iterations) } else { String::new() };
    match &state.completion_promise {
        Some(promise) => format!("HOTL iteration {}{cap} | Complete: <promise>{promise}</promise>", state.iteration),
        None => format!("HOTL iteration {}{cap}", state.iteration),
    }
}
