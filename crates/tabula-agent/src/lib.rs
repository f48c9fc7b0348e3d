// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recursive turn executor for the Tabula agent runtime.
//!
//! Exposes [`TurnExecutor`], which turns a message history and an
//! immutable [`tabula_core::TurnState`] into a lazy stream of
//! [`tabula_core::AgentEvent`]s, dispatching tool calls through the
//! registry and gating model calls on the shared limiter.

pub mod executor;

pub use executor::TurnExecutor;
