//! Read-file tool: read text content of a file under the working folder.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolContext, ToolSourceError};
use crate::tools::Tool;

use super::path::resolve_path_under;

/// Tool name for reading a file.
pub const TOOL_READ_FILE: &str = "read_file";

const DEFAULT_READ_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

/// Reads text content of a file under the working folder.
///
/// Supports offset (0-based line index) and limit. Lines longer than
/// `MAX_LINE_LENGTH` are truncated. Output format: `"  {line_num}\t{content}"`.
pub struct ReadFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl ReadFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        TOOL_READ_FILE
    }

    fn spec(&self) -> crate::tool_source::ToolSpec {
        crate::tool_source::ToolSpec::new(
            TOOL_READ_FILE,
            Some(
                "Read file content. Path relative to working folder. Optional offset (0-based) \
                 and limit (default 2000). Output in cat -n style with line numbers."
                    .to_string(),
            ),
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path relative to working folder." },
                    "offset": { "type": "integer", "description": "0-based line number to start reading from.", "minimum": 0 },
                    "limit": { "type": "integer", "description": "Max lines to read (default 2000).", "minimum": 1 }
                },
                "required": ["path"]
            }),
            crate::tool_source::ToolKind::Read,
        )
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        if ctx.cancellation.is_cancelled() {
            return Err(ToolSourceError::Cancelled);
        }
        let path_param = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing path".to_string()))?;
        let path = resolve_path_under(self.working_folder.as_ref(), path_param)?;
        if !path.exists() {
            return Err(ToolSourceError::InvalidInput(format!("file not found: {}", path.display())));
        }
        if path.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!("is a directory, not a file: {}", path.display())));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to read file: {e}")))?;

        let offset = args.get("offset").and_then(|v| v.as_u64()).map(|n| n as usize).unwrap_or(0);
        let limit = args.get("limit").and_then(|v| v.as_u64()).map(|n| n as usize).unwrap_or(DEFAULT_READ_LIMIT);

        let lines: Vec<&str> = content.split('\n').collect();
        let total = lines.len();
        let start = offset.min(total);
        let end = (start + limit).min(total);
        let selected = &lines[start..end];

        let mut out = String::new();
        for (i, line) in selected.iter().enumerate() {
            let line_num = start + i + 1;
            let truncated = if line.len() > MAX_LINE_LENGTH {
                format!("{}...", &line[..MAX_LINE_LENGTH])
            } else {
                (*line).to_string()
            };
            out.push_str(&format!("  {line_num}\t{truncated}\n"));
        }
        Ok(ToolCallContent { text: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;

    fn ctx(root: &std::path::Path) -> ToolContext {
        ToolContext::new(Arc::new(root.to_path_buf()), CancellationToken::new())
    }

    #[tokio::test]
    async fn reads_file_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "line1\nline2\n").unwrap();
        let tool = ReadFileTool::new(Arc::new(dir.path().to_path_buf()));
        let out = tool.call(json!({"path": "a.txt"}), &ctx(dir.path())).await.unwrap();
        assert!(out.text.contains("1\tline1"));
        assert!(out.text.contains("2\tline2"));
    }

    #[tokio::test]
    async fn missing_file_is_an_invalid_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(Arc::new(dir.path().to_path_buf()));
        let err = tool.call(json!({"path": "missing.txt"}), &ctx(dir.path())).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let tool = ReadFileTool::new(Arc::new(dir.path().to_path_buf()));
        let mut c = ctx(dir.path());
        c.cancellation.cancel();
        let err = tool.call(json!({"path": "a.txt"}), &c).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::Cancelled));
    }
}
