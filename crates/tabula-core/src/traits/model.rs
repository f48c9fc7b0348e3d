// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model backend trait for LLM integrations.

use async_trait::async_trait;

use crate::error::TabulaError;
use crate::types::{Message, ModelResponse};

/// Adapter for LLM backends.
///
/// Backends handle communication with a language model API. Streaming
/// implementations must resolve to the single request/response shape of
/// [`ModelResponse`] before the turn executor consumes them.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends the conversation plus an optional tool catalogue and returns
    /// the model's response.
    ///
    /// `tools` entries are JSON tool definitions of the shape
    /// `{"name", "description", "input_schema"}`.
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[serde_json::Value]>,
    ) -> Result<ModelResponse, TabulaError>;
}
