// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tabula agent runtime.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Tabula workspace. External collaborators
//! (model backend, data-source executor, telemetry sink) implement traits
//! defined here.

pub mod error;
pub mod recording;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TabulaError;
pub use types::{
    AgentEvent, ColumnInfo, CompletionRecord, Message, ModelResponse, QueryResult, Role,
    TableSchema, ToolCall, TurnState,
};

// Re-export all adapter traits at crate root.
pub use traits::{LogSink, ModelBackend, QueryExecutor, TelemetrySink};
