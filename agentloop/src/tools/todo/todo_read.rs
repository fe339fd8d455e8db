//! Todo-read tool: read the current plan from XDG state home.

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolContext, ToolSourceError};
use crate::tools::Tool;

use super::{todo_file_path, TodoItem, TodoStatus};

pub const TOOL_TODO_READ: &str = "todo_read";

/// Reads the todo list; returns an empty plan when the file is missing or
/// invalid rather than erroring, since an empty plan is a normal starting state.
pub struct TodoReadTool;

#[async_trait]
impl Tool for TodoReadTool {
    fn name(&self) -> &str {
        TOOL_TODO_READ
    }

    fn spec(&self) -> crate::tool_source::ToolSpec {
        crate::tool_source::ToolSpec::new(
            TOOL_TODO_READ,
            Some("Read the current todo list.".to_string()),
            json!({ "type": "object", "properties": {}, "required": [] }),
            crate::tool_source::ToolKind::Read,
        )
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let path = todo_file_path()?;
        let todos: Vec<TodoItem> = if path.exists() && path.is_file() {
            let s = std::fs::read_to_string(&path).unwrap_or_default();
            serde_json::from_str(&s).unwrap_or_default()
        } else {
            Vec::new()
        };
        let incomplete = todos.iter().filter(|t| t.status != TodoStatus::Completed).count();
        let output = serde_json::to_string_pretty(&todos).unwrap_or_else(|_| "[]".to_string());
        Ok(ToolCallContent { text: format!("{incomplete} todos\n{output}") })
    }
}
