// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL generation coordinator.
//!
//! Turns a natural-language analytic request plus a context snapshot into
//! a validated SQL string, or a structured failure with remediation
//! suggestions. Candidate statements come from the turn executor; they
//! are validated against the schema retriever and a dry-run execution,
//! with failures classified and retried under a hard attempt budget.

pub mod coordinator;
pub mod prompt;
pub mod retry;

pub use coordinator::{
    AttemptRecord, ContextSnapshot, GenerationMetadata, GenerationResult, SqlCoordinator,
    TimeWindow,
};
pub use retry::{classify_error, SqlErrorType, SqlRetryContext};
