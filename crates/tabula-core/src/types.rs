// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Tabula runtime.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of a message in the conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A structured request from the model to invoke a named capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id assigned by the model; tool results are re-associated by this id.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as a field-name-keyed map.
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// A single message in the conversation. The ordered sequence of messages
/// forms the conversation and is append-only within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls requested by an assistant message, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool-result messages: the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant message carrying the tool calls it requested.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool-result message answering the call with the given id.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Immutable per-turn state driving the recursive turn executor.
///
/// A state is never mutated: [`TurnState::next`] returns a fresh value with
/// the counter advanced and `parent_turn_id` pointing back at this state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Unique id of this turn.
    pub turn_id: String,
    /// Monotonically increasing turn counter, starting at 0.
    pub turn_counter: u32,
    /// Back-reference to the previous turn, never an ownership edge.
    pub parent_turn_id: Option<String>,
    /// Hard recursion cap for the run.
    pub max_iterations: u32,
}

impl TurnState {
    /// Creates the root state for a new run.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            turn_counter: 0,
            parent_turn_id: None,
            max_iterations,
        }
    }

    /// Returns the successor state: counter advanced by one, parent set to self.
    pub fn next(&self) -> Self {
        Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            turn_counter: self.turn_counter + 1,
            parent_turn_id: Some(self.turn_id.clone()),
            max_iterations: self.max_iterations,
        }
    }

    /// A state is terminal once the counter reaches the iteration cap.
    pub fn is_final(&self) -> bool {
        self.turn_counter >= self.max_iterations
    }
}

/// Lifecycle events emitted lazily by the turn executor.
///
/// Consumers may stop consuming at any time; an unpolled stream issues no
/// further model or tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A model call is about to be issued.
    LlmStart,
    /// One tool call completed; `payload` is the raw result content.
    ToolResult { tool_name: String, payload: String },
    /// The executor is recursing into the next turn at the given depth.
    Recursion { depth: u32 },
    /// Terminal event: the run finished with this content.
    AgentFinish { content: String },
}

/// Response from a model backend: terminal text plus any requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Normalized result of a data-source query.
///
/// Rows are always field-name-keyed maps; the core never accepts positional
/// tabular rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn ok(rows: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        Self {
            success: true,
            rows,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A single column in a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Table metadata as returned by a data-source executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Structured completion/failure record emitted to the telemetry sink after
/// each generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Id of the generation session (the coordinator's placeholder id).
    pub session_id: String,
    pub success: bool,
    /// Classified error type on failure (e.g. "table_not_found").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Total model-backed attempts consumed.
    pub attempts: u32,
    pub latency_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
