//! Todo-write tool: replace the todo list at XDG state home.

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolContext, ToolSourceError};
use crate::tools::Tool;

use super::{todo_file_path, TodoItem, TodoStatus};

pub const TOOL_TODO_WRITE: &str = "todo_write";

/// Writes or replaces the todo list. Accepts the full list every call
/// (no partial update), mirroring how the agent re-states its whole plan
/// each time it revises it.
pub struct TodoWriteTool;

fn parse_status(raw: &str) -> TodoStatus {
    match raw {
        "in_progress" => TodoStatus::InProgress,
        "completed" => TodoStatus::Completed,
        _ => TodoStatus::Pending,
    }
}

fn parse_todos(args: &serde_json::Value) -> Result<Vec<TodoItem>, ToolSourceError> {
    let arr = args
        .get("todos")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolSourceError::InvalidInput("missing or invalid 'todos' array".to_string()))?;
    let mut out = Vec::with_capacity(arr.len());
    for (i, v) in arr.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| ToolSourceError::InvalidInput(format!("todos[{i}] must be an object")))?;
        let id = obj
            .get("id")
            .and_then(|x| x.as_str())
            .map(String::from)
            .ok_or_else(|| ToolSourceError::InvalidInput(format!("todos[{i}] missing 'id'")))?;
        let content = obj
            .get("content")
            .and_then(|x| x.as_str())
            .map(String::from)
            .ok_or_else(|| ToolSourceError::InvalidInput(format!("todos[{i}] missing 'content'")))?;
        let active_form = obj
            .get("active_form")
            .and_then(|x| x.as_str())
            .map(String::from)
            .unwrap_or_else(|| content.clone());
        let status = obj.get("status").and_then(|x| x.as_str()).map(parse_status).unwrap_or(TodoStatus::Pending);
        out.push(TodoItem { id, content, active_form, status });
    }
    Ok(out)
}

/// Returns a warning line when more than one item is `InProgress`; the
/// invariant is surfaced, not enforced, per the data model's "violation
/// surfaces as a warning, not an error".
fn in_progress_warning(todos: &[TodoItem]) -> Option<String> {
    let count = todos.iter().filter(|t| t.status == TodoStatus::InProgress).count();
    (count > 1).then(|| format!("warning: {count} items are in_progress; expected at most one"))
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        TOOL_TODO_WRITE
    }

    fn spec(&self) -> crate::tool_source::ToolSpec {
        crate::tool_source::ToolSpec::new(
            TOOL_TODO_WRITE,
            Some("Write or replace the todo list.".to_string()),
            json!({
                "type": "object",
                "properties": { "todos": { "type": "array" } },
                "required": ["todos"]
            }),
            crate::tool_source::ToolKind::Edit,
        )
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let todos = parse_todos(&args)?;
        let path = todo_file_path()?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dir: {e}")))?;
            }
        }
        let json_bytes = serde_json::to_string_pretty(&todos)
            .map_err(|e| ToolSourceError::Transport(format!("failed to serialize todos: {e}")))?;
        std::fs::write(&path, json_bytes)
            .map_err(|e| ToolSourceError::Transport(format!("failed to write {}: {e}", path.display())))?;

        let incomplete = todos.iter().filter(|t| t.status != TodoStatus::Completed).count();
        let output = serde_json::to_string_pretty(&todos).unwrap_or_else(|_| "[]".to_string());
        let mut text = format!("{incomplete} todos\n{output}");
        if let Some(warning) = in_progress_warning(&todos) {
            text = format!("{warning}\n{text}");
        }
        Ok(ToolCallContent { text })
    }
}
