// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model backend for deterministic testing.
//!
//! `MockModel` implements `ModelBackend` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tabula_core::traits::model::ModelBackend;
use tabula_core::{Message, ModelResponse, TabulaError, ToolCall};

/// A mock model backend that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty, a
/// default plain-text "mock response" is returned.
pub struct MockModel {
    responses: Arc<Mutex<VecDeque<ModelResponse>>>,
    calls: AtomicUsize,
    /// Message lists captured per call, for asserting prompt contents.
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockModel {
    /// Create a new mock model with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: AtomicUsize::new(0),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock model pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            calls: AtomicUsize::new(0),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn push_response(&self, response: ModelResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Number of `generate` calls issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists captured from each call.
    pub async fn captured_requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().await.clone()
    }

    /// Builds a plain-text (finish) response.
    pub fn text(content: impl Into<String>) -> ModelResponse {
        ModelResponse {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Builds a response requesting a single tool call.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> ModelResponse {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        ModelResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: id.into(),
                name: name.into(),
                arguments,
            }],
        }
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for MockModel {
    async fn generate(
        &self,
        messages: &[Message],
        _tools: Option<&[serde_json::Value]>,
    ) -> Result<ModelResponse, TabulaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(messages.to_vec());
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockModel::text("mock response")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_pop_in_fifo_order() {
        let model = MockModel::with_responses(vec![
            MockModel::text("first"),
            MockModel::text("second"),
        ]);
        let r1 = model.generate(&[], None).await.unwrap();
        let r2 = model.generate(&[], None).await.unwrap();
        let r3 = model.generate(&[], None).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
        assert_eq!(r3.content, "mock response");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn tool_call_builder_shapes_arguments() {
        let response =
            MockModel::tool_call("c1", "inspect_table", serde_json::json!({"table": "orders"}));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "inspect_table");
        assert_eq!(response.tool_calls[0].arguments["table"], "orders");
    }
}
