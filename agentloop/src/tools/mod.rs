//! Concrete tools and the registry that holds them.

pub mod file;
mod registry;
pub mod todo;
#[allow(clippy::module_inception)]
mod r#trait;

pub use file::{ReadFileTool, WriteFileTool, TOOL_READ_FILE, TOOL_WRITE_FILE};
pub use r#trait::Tool;
pub use registry::ToolRegistry;
pub use todo::{TodoItem, TodoReadTool, TodoStatus, TodoWriteTool, TOOL_TODO_READ, TOOL_TODO_WRITE};
