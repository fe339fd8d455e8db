//! Tool Registry: a fixed, insertion-ordered mapping from name to [`Tool`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::tool_source::{ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Holds every tool available to a run. Membership is fixed once built;
/// there is no runtime register/unregister, matching the spec's
/// "registry membership is fixed at construction" invariant.
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { order: Vec::new(), tools: HashMap::new() }
    }

    /// Registers a tool, replacing any earlier one with the same name in place
    /// (its position in enumeration order is preserved).
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tools in insertion order.
    pub fn enumerate(&self) -> Vec<Arc<dyn Tool>> {
        self.order.iter().filter_map(|n| self.tools.get(n).cloned()).collect()
    }

    /// JSON-schema list for the LLM request, in strict mode: every declared
    /// property is required and `additionalProperties` is forced to `false`
    /// (llama.cpp's grammar-constrained decoding rejects schemas without this).
    pub fn emit_schemas(&self, strict: bool) -> Vec<ToolSpec> {
        self.enumerate()
            .into_iter()
            .map(|t| {
                let mut spec = t.spec();
                if strict {
                    strict_harden(&mut spec.input_schema);
                }
                spec
            })
            .collect()
    }

    /// Remote stub source the LLM host can host-register for each tool: a
    /// function whose signature matches the schema and whose body
    /// unconditionally raises, signalling "this executes client-side".
    pub fn emit_client_stubs(&self) -> Vec<String> {
        self.enumerate()
            .into_iter()
            .map(|t| {
                format!(
                    "def {name}(**kwargs):\n    raise NotImplementedError(\"{name} executes client-side\")\n",
                    name = t.name()
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn strict_harden(schema: &mut Value) {
    if let Value::Object(map) = schema {
        if map.get("type").and_then(|t| t.as_str()) == Some("object") {
            if let Some(Value::Object(props)) = map.get("properties") {
                let required: Vec<Value> = props.keys().map(|k| Value::String(k.clone())).collect();
                map.insert("required".to_string(), Value::Array(required));
            }
            map.insert("additionalProperties".to_string(), Value::Bool(false));
        }
    }
}

/// Error returned when a name looked up in the registry has not been registered.
pub fn not_found(name: &str) -> ToolSourceError {
    ToolSourceError::NotFound(name.to_string())
}
