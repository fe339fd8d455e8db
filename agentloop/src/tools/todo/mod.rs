//! Todo tools: `todo_write`, `todo_read`.
//!
//! Persists the plan as JSON under XDG state home (e.g.
//! `~/.local/state/agentloop/todos.json` on Linux), same layout as loom's
//! todo tools. Fields are trimmed to what the Todo Item data model names:
//! content, present-continuous form, and status — loom's `priority` field is
//! dropped since nothing in this runtime reads it.

mod todo_read;
mod todo_write;

pub use todo_read::{TodoReadTool, TOOL_TODO_READ};
pub use todo_write::{TodoWriteTool, TOOL_TODO_WRITE};

const XDG_APP_NAME: &str = "agentloop";
const TODOS_FILENAME: &str = "todos.json";

/// Status of a [`TodoItem`]. At most one item should be `InProgress` at a
/// time; `todo_write` only warns (via the returned text) on violation, it
/// does not reject the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// A single task in the agent's plan.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TodoItem {
    pub id: String,
    /// Imperative form, e.g. "Fix the parser".
    pub content: String,
    /// Present-continuous form shown while the item is in progress, e.g. "Fixing the parser".
    pub active_form: String,
    pub status: TodoStatus,
}

/// Path to the todo list file under XDG state home.
pub fn todo_file_path() -> Result<std::path::PathBuf, crate::tool_source::ToolSourceError> {
    let base = cross_xdg::BaseDirs::new()
        .map_err(|e| crate::tool_source::ToolSourceError::InvalidInput(format!("XDG base dirs unavailable: {e}")))?;
    Ok(base.state_home().join(XDG_APP_NAME).join(TODOS_FILENAME))
}

#[cfg(test)]
pub(crate) static XDG_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_file_path_uses_xdg_state_home() {
        let _g = super::XDG_TEST_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_STATE_HOME", dir.path());
        let path = super::todo_file_path().unwrap();
        assert!(path.ends_with(std::path::Path::new(XDG_APP_NAME).join(TODOS_FILENAME)));
    }

    #[test]
    fn todo_item_roundtrips_through_json() {
        let item = TodoItem {
            id: "1".into(),
            content: "Fix the parser".into(),
            active_form: "Fixing the parser".into(),
            status: TodoStatus::InProgress,
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: TodoItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, TodoStatus::InProgress);
        assert_eq!(back.content, item.content);
    }
}
