//! File tools confined to a run's working folder.

mod path;
mod read_file;
mod write_file;

pub use path::resolve_path_under;
pub use read_file::{ReadFileTool, TOOL_READ_FILE};
pub use write_file::{WriteFileTool, TOOL_WRITE_FILE};
