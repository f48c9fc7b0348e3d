// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry and tool-calling protocol codec.
//!
//! This crate holds the dispatch table the turn executor drives: the
//! [`Tool`] trait, the [`ToolRegistry`], the protocol codec that turns a
//! tool catalogue into prompt text and model output back into actions,
//! the streaming JSON accumulator used for partial tool-call arguments,
//! and the built-in schema tools.

pub mod builtin;
pub mod codec;
pub mod streaming;
pub mod tool;

pub use builtin::{
    register_builtin_tools, CheckColumnsTool, CheckSqlTool, InspectTableTool, ListTablesTool,
};
pub use codec::{describe, parse, ParsedAction};
pub use streaming::JsonStreamParser;
pub use tool::{ParamSpec, ParamType, Tool, ToolOutput, ToolRegistry};
