//! Property 5 ("strict-schema conformance"): for every registered tool, the
//! schema assembled for the LLM request has `required` equal to
//! `properties.keys()` and `additionalProperties: false`.

use std::sync::Arc;

use agentloop::tools::{ReadFileTool, TodoReadTool, TodoWriteTool, ToolRegistry, WriteFileTool};

fn assert_strict(schema: &serde_json::Value) {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        panic!("tool schema has no properties object: {schema}");
    };
    let required: Vec<&str> = schema["required"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    let mut expected: Vec<&str> = properties.keys().map(String::as_str).collect();
    let mut actual = required;
    expected.sort_unstable();
    actual.sort_unstable();
    assert_eq!(actual, expected, "required must equal properties.keys() for schema: {schema}");
    assert_eq!(schema["additionalProperties"], serde_json::json!(false));
}

#[tokio::test]
async fn every_registered_tool_emits_a_strict_schema() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(Arc::new(dir.path().to_path_buf()))));
    registry.register(Arc::new(WriteFileTool::new(Arc::new(dir.path().to_path_buf()))));
    registry.register(Arc::new(TodoReadTool));
    registry.register(Arc::new(TodoWriteTool));

    let specs = registry.emit_schemas(true);
    assert_eq!(specs.len(), 4);
    for spec in &specs {
        assert_strict(&spec.input_schema);
    }
}
