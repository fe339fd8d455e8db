//! The `Tool` trait: name, schema, and invocation.
//!
//! Adapted from loom's `Tool` trait: the optional `ToolCallContext` becomes a
//! required `ToolContext` since the tool executor always builds one (it
//! carries the working directory and cancellation flag every call needs).

use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolContext, ToolSourceError, ToolSpec};

/// A single client-side-executable capability the model can invoke.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use agentloop::tools::Tool;
/// use agentloop::tool_source::{ToolCallContent, ToolContext, ToolKind, ToolSourceError, ToolSpec};
///
/// struct MyTool;
///
/// #[async_trait]
/// impl Tool for MyTool {
///     fn name(&self) -> &str {
///         "my_tool"
///     }
///
///     fn spec(&self) -> ToolSpec {
///         ToolSpec::new("my_tool", Some("A sample tool".to_string()), serde_json::json!({}), ToolKind::Other)
///     }
///
///     async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
///         Ok(ToolCallContent { text: "tool executed".to_string() })
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model and the registry refer to this tool by.
    fn name(&self) -> &str;

    /// JSON-schema description sent to the model.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool. Domain-level failures the model should see and
    /// react to belong in a successful `ToolCallContent` describing the
    /// problem; `Err` is reserved for conditions the executor itself should
    /// classify as an error result (the executor never lets this panic or
    /// propagate past a single call).
    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError>;
}
