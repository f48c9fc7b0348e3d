// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recursive turn execution as a pull-based event stream.
//!
//! [`TurnExecutor::run`] drives the model/tool loop: call the model,
//! dispatch any requested tool calls, append their results, and continue
//! with a fresh [`TurnState`]. Recursion is expressed as an explicit
//! state machine inside `futures::stream::unfold` rather than native
//! recursion, so depth costs no stack and a consumer that stops polling
//! the stream cancels all further model and tool work. Message history
//! and turn state are rebuilt each step, never mutated in place.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, Stream};
use tabula_core::{
    recording, AgentEvent, Message, ModelBackend, ModelResponse, TabulaError, ToolCall, TurnState,
};
use tabula_limiter::RateLimiter;
use tabula_tools::{codec, ToolRegistry};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Drives one agent run per [`TurnExecutor::run`] call.
pub struct TurnExecutor {
    model: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    limiter: Arc<RateLimiter>,
}

/// One run's in-flight state, rebuilt at every recursion step.
struct RunState {
    messages: Vec<Message>,
    turn_state: TurnState,
    pending: VecDeque<Result<AgentEvent, TabulaError>>,
    done: bool,
}

impl TurnExecutor {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            model,
            registry,
            limiter,
        }
    }

    /// Runs the agent loop, yielding lifecycle events lazily.
    ///
    /// The stream ends after `AgentFinish` or a fatal error. Dropping the
    /// stream before the end cancels the run. Timeout belongs to the
    /// caller, wrapped around the whole stream.
    pub fn run(
        self: Arc<Self>,
        messages: Vec<Message>,
        turn_state: TurnState,
    ) -> impl Stream<Item = Result<AgentEvent, TabulaError>> + Send + 'static {
        let executor = self;
        let state = RunState {
            messages,
            turn_state,
            pending: VecDeque::new(),
            done: false,
        };
        stream::unfold(state, move |mut state| {
            let executor = Arc::clone(&executor);
            async move {
                loop {
                    if let Some(event) = state.pending.pop_front() {
                        return Some((event, state));
                    }
                    if state.done {
                        return None;
                    }
                    executor.step(&mut state).await;
                }
            }
        })
    }

    /// Executes one turn, queuing its events onto `state.pending`.
    async fn step(&self, state: &mut RunState) {
        if state.turn_state.is_final() {
            debug!(
                turn_id = %state.turn_state.turn_id,
                max_iterations = state.turn_state.max_iterations,
                "iteration limit reached, finishing"
            );
            state.pending.push_back(Ok(AgentEvent::AgentFinish {
                content: best_effort_content(&state.messages),
            }));
            state.done = true;
            return;
        }

        state.pending.push_back(Ok(AgentEvent::LlmStart));
        let response = match self.call_model(&state.messages).await {
            Ok(response) => response,
            Err(e) => {
                state.pending.push_back(Err(e));
                state.done = true;
                return;
            }
        };

        // Prefer native tool calls; fall back to the textual protocol for
        // backends that answer in-band.
        let (content, tool_calls) = if response.tool_calls.is_empty() {
            match codec::parse(&response.content) {
                Ok(codec::ParsedAction::Finish { content }) => (content, Vec::new()),
                Ok(codec::ParsedAction::ToolCalls(calls)) => (response.content.clone(), calls),
                Err(e) => {
                    // Malformed protocol output costs a turn and goes back
                    // to the model so it can self-correct.
                    warn!(error = %e, "unparseable model output, feeding back");
                    let mut messages = state.messages.clone();
                    messages.push(Message::assistant(response.content.clone()));
                    messages.push(Message::tool_result(
                        "protocol",
                        format!(
                            "Invalid response: {e}. Respond with exactly one JSON \
                             action object."
                        ),
                    ));
                    let next = state.turn_state.next();
                    state.pending.push_back(Ok(AgentEvent::Recursion {
                        depth: next.turn_counter,
                    }));
                    state.messages = messages;
                    state.turn_state = next;
                    return;
                }
            }
        } else {
            (response.content.clone(), response.tool_calls.clone())
        };

        if tool_calls.is_empty() {
            state
                .pending
                .push_back(Ok(AgentEvent::AgentFinish { content }));
            state.done = true;
            return;
        }

        let results = self.dispatch_all(&tool_calls).await;

        let mut messages = state.messages.clone();
        messages.push(Message::assistant_with_calls(&content, tool_calls.clone()));
        for (call, (payload, _is_error)) in tool_calls.iter().zip(&results) {
            state.pending.push_back(Ok(AgentEvent::ToolResult {
                tool_name: call.name.clone(),
                payload: payload.clone(),
            }));
            messages.push(Message::tool_result(&call.id, payload));
        }

        let next = state.turn_state.next();
        state.pending.push_back(Ok(AgentEvent::Recursion {
            depth: next.turn_counter,
        }));
        state.messages = messages;
        state.turn_state = next;
    }

    /// Issues one limiter-gated model call.
    async fn call_model(&self, messages: &[Message]) -> Result<ModelResponse, TabulaError> {
        if !self.limiter.acquire().await {
            warn!("model call rejected by the limiter");
            return Err(TabulaError::RateLimited(
                "concurrency cap reached, model call rejected".into(),
            ));
        }
        let definitions = self.registry.definitions();
        let started = Instant::now();
        let result = self.model.generate(messages, Some(&definitions)).await;
        self.limiter.release(result.is_ok(), started.elapsed());
        recording::record_model_call();
        result
    }

    /// Dispatches all requested calls concurrently, preserving the model's
    /// request order in the returned results.
    async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<(String, bool)> {
        let futures = calls.iter().map(|call| {
            let registry = Arc::clone(&self.registry);
            async move {
                let output = registry.dispatch(call).await;
                recording::record_tool_call(&call.name);
                (output.content, output.is_error)
            }
        });
        join_all(futures).await
    }
}

/// Best-effort terminal content when the iteration cap ends a run: the
/// last assistant text seen, or a fixed notice if there was none.
fn best_effort_content(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == tabula_core::Role::Assistant && !m.content.is_empty())
        .map(|m| m.content.clone())
        .unwrap_or_else(|| "Reached the iteration limit without a final answer.".to_string())
}
