// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! The [`Tool`] trait defines the unified interface for capabilities the
//! model may invoke (schema lookup, SQL validation, column validation).
//! The [`ToolRegistry`] manages tool lookup by name, generates tool
//! definitions for the model backend, and dispatches parsed tool calls.
//! Dispatch failures are returned as structured, model-visible errors so
//! the model gets a chance to self-correct on the next turn.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabula_core::{TabulaError, ToolCall};
use tracing::debug;

/// Primitive type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// One declared tool parameter, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: false,
            description: description.to_string(),
        }
    }
}

/// Output from a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The content returned by the tool (text output, JSON, etc.).
    pub content: String,
    /// Whether the invocation resulted in an error.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Unified trait for all model-invocable capabilities.
///
/// Every tool declares a name, description, an ordered parameter list, and
/// one usage example. The turn executor calls [`ToolRegistry::dispatch`]
/// with the parsed call from the model response.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for lookup and catalogue serialization).
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Declared parameters, in order.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// One example arguments object, shown in the catalogue.
    fn example(&self) -> serde_json::Value;

    /// Invokes the tool with validated arguments.
    async fn invoke(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, TabulaError>;
}

/// Registry of available tools, indexed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool, indexed by its `name()`.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tools sorted by name.
    pub fn sorted(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// JSON tool definitions for the model backend, sorted by name.
    ///
    /// Each definition has the shape
    /// `{"name", "description", "input_schema"}` where `input_schema` is a
    /// JSON Schema object built from the declared parameters.
    pub fn definitions(&self) -> Vec<serde_json::Value> {
        self.sorted()
            .iter()
            .map(|t| {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for p in t.parameters() {
                    properties.insert(
                        p.name.clone(),
                        serde_json::json!({
                            "type": p.param_type.as_str(),
                            "description": p.description,
                        }),
                    );
                    if p.required {
                        required.push(serde_json::Value::String(p.name));
                    }
                }
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    },
                })
            })
            .collect()
    }

    /// Dispatches one parsed tool call.
    ///
    /// Unknown tool names and argument/schema mismatches are returned as
    /// error outputs (model-visible), never as `Err`: the result is fed
    /// back into the conversation so the model can correct itself.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.get(&call.name) else {
            let known: Vec<&str> = {
                let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
                names.sort_unstable();
                names
            };
            return ToolOutput::error(format!(
                "unknown tool `{}`; available tools: {}",
                call.name,
                known.join(", ")
            ));
        };

        if let Err(message) = validate_arguments(&tool.parameters(), &call.arguments) {
            return ToolOutput::error(format!("invalid arguments for `{}`: {message}", call.name));
        }

        debug!(tool = %call.name, call_id = %call.id, "dispatching tool call");
        match tool.invoke(&call.arguments).await {
            Ok(output) => output,
            Err(e) => ToolOutput::error(format!("tool `{}` failed: {e}", call.name)),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Validates arguments against the declared parameter list: required
/// parameters present, declared types respected, no undeclared keys.
fn validate_arguments(
    specs: &[ParamSpec],
    arguments: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), String> {
    for spec in specs {
        match arguments.get(&spec.name) {
            Some(value) => {
                if !spec.param_type.matches(value) {
                    return Err(format!(
                        "parameter `{}` must be of type {}",
                        spec.name,
                        spec.param_type.as_str()
                    ));
                }
            }
            None if spec.required => {
                return Err(format!("missing required parameter `{}`", spec.name));
            }
            None => {}
        }
    }
    for key in arguments.keys() {
        if !specs.iter().any(|s| &s.name == key) {
            return Err(format!("undeclared parameter `{key}`"));
        }
    }
    Ok(())
}
