// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tabula agent runtime.

use thiserror::Error;

/// The primary error type used across all Tabula adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TabulaError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Model backend errors (API failure, malformed response, token limits).
    #[error("model error: {message}")]
    Model {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Data source executor errors (connection failure, query failure).
    #[error("executor error: {message}")]
    Executor {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A tool invocation failed or was given invalid arguments.
    #[error("tool error in `{name}`: {message}")]
    Tool { name: String, message: String },

    /// The model emitted output the tool-calling protocol could not parse.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The shared limiter rejected the request (concurrency or pacing cap).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TabulaError {
    /// Convenience constructor for model errors without an underlying source.
    pub fn model(message: impl Into<String>) -> Self {
        TabulaError::Model {
            message: message.into(),
            source: None,
        }
    }

    /// Convenience constructor for executor errors without an underlying source.
    pub fn executor(message: impl Into<String>) -> Self {
        TabulaError::Executor {
            message: message.into(),
            source: None,
        }
    }
}
