// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-calling protocol codec.
//!
//! [`describe`] renders a deterministic, model-readable catalogue of the
//! registered tools. [`parse`] interprets raw model output as either a
//! terminal answer or a list of structured tool invocations: it expects an
//! action object (`{"action": "tool_call", ...}` or
//! `{"action": "finish", ...}`), tolerates surrounding prose and fenced
//! code blocks, and falls back to streaming repair for truncated JSON.
//! Output that carries no recognizable action is treated as a finish with
//! the text as content.

use tabula_core::{TabulaError, ToolCall};
use uuid::Uuid;

use crate::streaming::JsonStreamParser;
use crate::tool::ToolRegistry;

/// A model response decoded into one of the two permitted actions.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAction {
    /// Terminal answer; the run stops here.
    Finish { content: String },
    /// One or more tool invocations to dispatch before recursing.
    ToolCalls(Vec<ToolCall>),
}

/// Renders the tool catalogue as deterministic prompt text.
///
/// Tools appear sorted by name (the registry sorts), each with its
/// description, parameters tagged required/optional, and one example
/// invocation.
pub fn describe(registry: &ToolRegistry) -> String {
    let mut out = String::from("Available tools:\n");
    for tool in registry.sorted() {
        out.push_str(&format!("\n## {}\n{}\n", tool.name(), tool.description()));
        let params = tool.parameters();
        if params.is_empty() {
            out.push_str("Parameters: none\n");
        } else {
            out.push_str("Parameters:\n");
            for p in &params {
                let tag = if p.required { "required" } else { "optional" };
                out.push_str(&format!(
                    "- {} ({}, {}): {}\n",
                    p.name,
                    p.param_type.as_str(),
                    tag,
                    p.description
                ));
            }
        }
        out.push_str(&format!(
            "Example: {{\"action\": \"tool_call\", \"tool_calls\": [{{\"name\": \"{}\", \"arguments\": {}}}]}}\n",
            tool.name(),
            tool.example()
        ));
    }
    out.push_str(
        "\nRespond with exactly one JSON action object: \
         {\"action\": \"tool_call\", \"tool_calls\": [{\"name\": ..., \"arguments\": {...}}]} \
         to invoke tools, or {\"action\": \"finish\", \"content\": ...} to answer.\n",
    );
    out
}

/// Parses raw model output into a [`ParsedAction`].
///
/// Extraction order: the whole trimmed output as JSON, then the body of a
/// fenced code block, then the first balanced (or repairable) top-level
/// object found by brace scanning. A `tool_call` action with an empty
/// `tool_calls` array is a protocol violation and yields an error; output
/// with no action object at all is a plain finish.
pub fn parse(model_output: &str) -> Result<ParsedAction, TabulaError> {
    // Leniency: a bare top-level array is accepted as a tool_call list.
    if let Ok(serde_json::Value::Array(calls)) =
        serde_json::from_str::<serde_json::Value>(model_output.trim())
    {
        return parse_calls(calls);
    }
    let Some(value) = extract_action_object(model_output) else {
        return Ok(ParsedAction::Finish {
            content: model_output.trim().to_string(),
        });
    };

    match value.get("action").and_then(|a| a.as_str()) {
        Some("finish") => {
            let content = value
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(ParsedAction::Finish { content })
        }
        Some("tool_call") => {
            let calls = value
                .get("tool_calls")
                .and_then(|c| c.as_array())
                .cloned()
                .unwrap_or_default();
            parse_calls(calls)
        }
        Some(other) => Err(TabulaError::Protocol(format!("unknown action `{other}`"))),
        None => Ok(ParsedAction::Finish {
            content: model_output.trim().to_string(),
        }),
    }
}

/// Converts a raw array of call objects into structured [`ToolCall`]s.
fn parse_calls(calls: Vec<serde_json::Value>) -> Result<ParsedAction, TabulaError> {
    if calls.is_empty() {
        return Err(TabulaError::Protocol(
            "tool_call action with empty tool_calls array".into(),
        ));
    }
    let mut parsed = Vec::with_capacity(calls.len());
    for call in calls {
        let Some(name) = call.get("name").and_then(|n| n.as_str()) else {
            return Err(TabulaError::Protocol(
                "tool call missing `name` field".into(),
            ));
        };
        let arguments = match call.get("arguments") {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(TabulaError::Protocol(format!(
                    "tool call `{name}` arguments must be an object, got {other}"
                )));
            }
            None => serde_json::Map::new(),
        };
        let id = call
            .get("id")
            .and_then(|i| i.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        parsed.push(ToolCall {
            id,
            name: name.to_string(),
            arguments,
        });
    }
    Ok(ParsedAction::ToolCalls(parsed))
}

/// Locates and parses the action object embedded in model output.
fn extract_action_object(output: &str) -> Option<serde_json::Value> {
    let trimmed = output.trim();
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed)
        && v.is_object()
    {
        return Some(v);
    }
    if let Some(body) = fenced_block(trimmed)
        && let Some(v) = parse_lenient(body)
    {
        return Some(v);
    }
    if let Some(start) = trimmed.find('{') {
        return parse_lenient(&trimmed[start..]);
    }
    None
}

/// Parses a candidate object, scanning to its balance point and repairing
/// a truncated tail if needed.
fn parse_lenient(candidate: &str) -> Option<serde_json::Value> {
    let mut parser = JsonStreamParser::new();
    let mut end = candidate.len();
    let mut started = false;
    for (i, c) in candidate.char_indices() {
        parser.feed(&c.to_string());
        if c == '{' {
            started = true;
        }
        if started && parser.is_balanced() {
            end = i + c.len_utf8();
            break;
        }
    }
    serde_json::from_str(&candidate[..end])
        .ok()
        .or_else(|| parser.parse_with_repair())
        .filter(serde_json::Value::is_object)
}

/// Returns the body of the first fenced code block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "inspect_table"
        }
        fn description(&self) -> &str {
            "Returns the columns of a table"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required(
                "table",
                ParamType::String,
                "Table name",
            )]
        }
        fn example(&self) -> serde_json::Value {
            serde_json::json!({"table": "orders"})
        }
        async fn invoke(
            &self,
            _arguments: &serde_json::Map<String, serde_json::Value>,
        ) -> Result<ToolOutput, TabulaError> {
            Ok(ToolOutput::ok(""))
        }
    }

    #[test]
    fn describe_lists_tools_with_parameters_and_example() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(LookupTool));
        let text = describe(&registry);
        assert!(text.contains("## inspect_table"));
        assert!(text.contains("table (string, required): Table name"));
        assert!(text.contains(r#"{"table":"orders"}"#));
        assert!(text.contains(r#""action": "finish""#));
    }

    #[test]
    fn describe_is_deterministic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(LookupTool));
        assert_eq!(describe(&registry), describe(&registry));
    }

    #[test]
    fn parses_finish_action() {
        let action = parse(r#"{"action": "finish", "content": "SELECT 1"}"#).unwrap();
        assert_eq!(
            action,
            ParsedAction::Finish {
                content: "SELECT 1".into()
            }
        );
    }

    #[test]
    fn parses_tool_call_action() {
        let action = parse(
            r#"{"action": "tool_call", "tool_calls": [{"name": "inspect_table", "arguments": {"table": "orders"}}]}"#,
        )
        .unwrap();
        let ParsedAction::ToolCalls(calls) = action else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "inspect_table");
        assert_eq!(calls[0].arguments["table"], "orders");
        assert!(!calls[0].id.is_empty());
    }

    #[test]
    fn parses_action_inside_fenced_block() {
        let output = "Here is my plan.\n```json\n{\"action\": \"finish\", \"content\": \"done\"}\n```\n";
        let action = parse(output).unwrap();
        assert_eq!(
            action,
            ParsedAction::Finish {
                content: "done".into()
            }
        );
    }

    #[test]
    fn repairs_truncated_action_object() {
        let output = r#"{"action": "tool_call", "tool_calls": [{"name": "list_tables", "arguments": {}"#;
        let ParsedAction::ToolCalls(calls) = parse(output).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "list_tables");
    }

    #[test]
    fn bare_array_is_accepted_as_tool_calls() {
        let output = r#"[{"name": "list_tables", "arguments": {}}]"#;
        let ParsedAction::ToolCalls(calls) = parse(output).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "list_tables");
    }

    #[test]
    fn multiple_calls_keep_source_ids_and_order() {
        let output = r#"{"action": "tool_call", "tool_calls": [
            {"id": "c1", "name": "list_tables", "arguments": {}},
            {"id": "c2", "name": "inspect_table", "arguments": {"table": "orders"}},
            {"id": "c3", "name": "inspect_table", "arguments": {"table": "customers"}}
        ]}"#;
        let ParsedAction::ToolCalls(calls) = parse(output).unwrap() else {
            panic!("expected tool calls");
        };
        let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
        assert_eq!(calls[1].arguments["table"], "orders");
        assert_eq!(calls[2].arguments["table"], "customers");
    }

    #[test]
    fn plain_text_is_a_finish() {
        let action = parse("The answer is 42 rows.").unwrap();
        assert_eq!(
            action,
            ParsedAction::Finish {
                content: "The answer is 42 rows.".into()
            }
        );
    }

    #[test]
    fn empty_tool_calls_is_a_protocol_error() {
        let err = parse(r#"{"action": "tool_call", "tool_calls": []}"#).unwrap_err();
        assert!(matches!(err, TabulaError::Protocol(_)));
    }

    #[test]
    fn non_object_arguments_is_a_protocol_error() {
        let err = parse(
            r#"{"action": "tool_call", "tool_calls": [{"name": "x", "arguments": "orders"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TabulaError::Protocol(_)));
    }

    #[test]
    fn unknown_action_is_a_protocol_error() {
        let err = parse(r#"{"action": "dance"}"#).unwrap_err();
        assert!(matches!(err, TabulaError::Protocol(_)));
    }
}
