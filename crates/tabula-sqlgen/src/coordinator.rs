// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL generation coordinator.
//!
//! [`SqlCoordinator::generate`] drives a bounded number of generation
//! attempts through the turn executor, validating every candidate against
//! the schema retriever and, when enabled, a dry-run execution. Failures
//! are classified and fed back into the next attempt as targeted
//! guidance; connection and permission failures end the session at once.
//! The first candidate that passes validation wins.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tabula_agent::TurnExecutor;
use tabula_config::TabulaConfig;
use tabula_core::{
    recording, AgentEvent, CompletionRecord, Message, ModelBackend, QueryExecutor, TableSchema,
    TabulaError, TelemetrySink, TurnState,
};
use tabula_limiter::RateLimiter;
use tabula_schema::{table_references, validate_references, SchemaRetriever};
use tabula_tools::{register_builtin_tools, ToolRegistry};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::prompt::{extract_sql, sql_system_prompt};
use crate::retry::{classify_error, SqlErrorType, SqlRetryContext};

/// Inclusive date range the generated SQL must honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Caller-supplied context for one generation session. Both fields are
/// hard dependencies; a missing one short-circuits the session before any
/// model call is spent.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub time_window: Option<TimeWindow>,
    pub tables: Vec<TableSchema>,
}

/// One failed attempt in the session trail.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub sql: String,
    pub error_type: SqlErrorType,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerationMetadata {
    pub attempts: u32,
    pub confidence: f32,
    pub suggestions: Vec<String>,
    pub trail: Vec<AttemptRecord>,
}

/// Outcome of one `generate()` invocation. `sql` is present iff
/// `success`; `error` is present iff not.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    pub sql: Option<String>,
    pub error: Option<String>,
    pub needs_user_input: bool,
    pub metadata: GenerationMetadata,
}

impl GenerationResult {
    fn validated(sql: String, metadata: GenerationMetadata) -> Self {
        Self {
            success: true,
            sql: Some(sql),
            error: None,
            needs_user_input: false,
            metadata,
        }
    }

    fn failure(error: String, metadata: GenerationMetadata) -> Self {
        Self {
            success: false,
            sql: None,
            error: Some(error),
            needs_user_input: false,
            metadata,
        }
    }

    fn needs_input(dependency: &str) -> Self {
        Self {
            success: false,
            sql: None,
            error: Some(format!(
                "cannot generate SQL without a {dependency}; please provide one"
            )),
            needs_user_input: true,
            metadata: GenerationMetadata::default(),
        }
    }
}

/// Coordinates generation sessions against one data source.
pub struct SqlCoordinator {
    model: Arc<dyn ModelBackend>,
    retriever: Arc<SchemaRetriever>,
    executor: Arc<dyn QueryExecutor>,
    limiter: Arc<RateLimiter>,
    telemetry: Arc<dyn TelemetrySink>,
    config: TabulaConfig,
}

impl SqlCoordinator {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        retriever: Arc<SchemaRetriever>,
        executor: Arc<dyn QueryExecutor>,
        limiter: Arc<RateLimiter>,
        telemetry: Arc<dyn TelemetrySink>,
        config: TabulaConfig,
    ) -> Self {
        Self {
            model,
            retriever,
            executor,
            limiter,
            telemetry,
            config,
        }
    }

    /// Runs one generation session for `query`.
    ///
    /// Returns `Err` only on adapter faults (model/data-source plumbing);
    /// every query-level failure is reported inside the
    /// [`GenerationResult`].
    pub async fn generate(
        &self,
        query: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<GenerationResult, TabulaError> {
        let Some(window) = snapshot.time_window else {
            debug!(query, "missing time window, asking the caller");
            return Ok(GenerationResult::needs_input("time window"));
        };
        if snapshot.tables.is_empty() {
            debug!(query, "missing schema snapshot, asking the caller");
            return Ok(GenerationResult::needs_input("schema snapshot"));
        }

        let session_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let generation = &self.config.generation;
        let budget = generation.max_generation_attempts * (1 + generation.max_fix_attempts);

        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, Arc::clone(&self.retriever));
        let catalogue = tabula_tools::describe(&registry);
        let agent = Arc::new(TurnExecutor::new(
            Arc::clone(&self.model),
            Arc::new(registry),
            Arc::clone(&self.limiter),
        ));

        let mut trail: Vec<AttemptRecord> = Vec::new();
        let mut retry_ctx: Option<SqlRetryContext> = None;
        let mut attempts = 0u32;
        let mut fatal = false;

        loop {
            attempts += 1;
            let guidance = retry_ctx.as_ref().map(SqlRetryContext::guidance);
            let system = sql_system_prompt(&snapshot.tables, &window, guidance.as_deref());
            let messages = vec![
                Message::system(format!("{system}\n\n{catalogue}")),
                Message::user(query),
            ];

            let candidate = self
                .run_attempt(&agent, messages, self.config.agent.max_iterations)
                .await?;
            let sql = extract_sql(&candidate);
            debug!(session_id = %session_id, attempt = attempts, sql = %sql, "candidate SQL");

            match self.validate(&sql).await? {
                None => {
                    for table in table_references(&sql).values() {
                        self.retriever.record_usage(table);
                    }
                    let metadata = GenerationMetadata {
                        attempts,
                        confidence: 1.0 / attempts as f32,
                        suggestions: Vec::new(),
                        trail,
                    };
                    recording::record_generation("success");
                    info!(session_id = %session_id, attempts, "SQL validated");
                    self.record(&session_id, true, None, attempts, started).await;
                    return Ok(GenerationResult::validated(sql, metadata));
                }
                Some(error) => {
                    let error_type = classify_error(&error);
                    warn!(
                        session_id = %session_id,
                        attempt = attempts,
                        error_type = %error_type,
                        error = %error,
                        "candidate rejected"
                    );
                    trail.push(AttemptRecord {
                        attempt: attempts,
                        sql: sql.clone(),
                        error_type,
                        error: error.clone(),
                    });
                    if error_type.is_fatal() {
                        fatal = true;
                        break;
                    }
                    let mut ctx = match retry_ctx.take() {
                        Some(mut ctx) => {
                            ctx.original_sql = sql;
                            ctx.error_type = error_type;
                            ctx.error_message = error;
                            ctx
                        }
                        None => SqlRetryContext::new(
                            &session_id,
                            sql,
                            error,
                            budget.saturating_sub(1),
                        ),
                    };
                    if !ctx.can_retry() {
                        break;
                    }
                    ctx.increment_retry();
                    retry_ctx = Some(ctx);
                }
            }
        }

        let last = trail.last();
        let error = match last {
            Some(rec) if fatal => format!(
                "{}: {} (not retried; fix the infrastructure, not the query)",
                rec.error_type, rec.error
            ),
            Some(rec) => format!(
                "no valid SQL after {attempts} attempts; last error {}: {}",
                rec.error_type, rec.error
            ),
            None => format!("no valid SQL after {attempts} attempts"),
        };
        let error_type = last.map(|rec| rec.error_type.to_string());
        let mut suggestions: Vec<String> = Vec::new();
        for rec in &trail {
            let hint = rec.error_type.remediation().to_string();
            if !suggestions.contains(&hint) {
                suggestions.push(hint);
            }
        }
        let last_sql = last.map(|rec| rec.sql.clone());
        let metadata = GenerationMetadata {
            attempts,
            confidence: 0.0,
            suggestions,
            trail,
        };
        recording::record_generation("failure");
        self.record(&session_id, false, error_type, attempts, started)
            .await;
        let mut result = GenerationResult::failure(error, metadata);
        // Keep the last attempted SQL visible to the caller even on failure.
        result.sql = last_sql;
        Ok(result)
    }

    /// Runs the turn executor to completion and returns the terminal
    /// content.
    async fn run_attempt(
        &self,
        agent: &Arc<TurnExecutor>,
        messages: Vec<Message>,
        max_iterations: u32,
    ) -> Result<String, TabulaError> {
        let mut stream = Box::pin(Arc::clone(agent).run(messages, TurnState::new(max_iterations)));
        let mut content = String::new();
        while let Some(event) = stream.next().await {
            if let AgentEvent::AgentFinish { content: c } = event? {
                content = c;
            }
        }
        Ok(content)
    }

    /// Validates a candidate: schema references first, then an optional
    /// limiter-gated `LIMIT 1` dry-run. Returns the error text on
    /// rejection, `None` when the candidate passes.
    async fn validate(&self, sql: &str) -> Result<Option<String>, TabulaError> {
        if sql.is_empty() {
            return Ok(Some("the model returned no SQL statement".to_string()));
        }
        let issues = validate_references(&self.retriever, sql).await?;
        if !issues.is_empty() {
            let joined = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(Some(joined));
        }
        if !self.config.generation.enable_dry_run_validation {
            return Ok(None);
        }
        if !self.limiter.acquire().await {
            return Err(TabulaError::RateLimited(
                "concurrency cap reached, dry-run rejected".into(),
            ));
        }
        let started = Instant::now();
        let result = self.executor.execute_query(sql, Some(1)).await;
        let outcome = matches!(&result, Ok(r) if r.success);
        self.limiter.release(outcome, started.elapsed());
        let result = result?;
        if result.success {
            Ok(None)
        } else {
            Ok(Some(result.error.unwrap_or_else(|| {
                "dry-run failed without an error message".to_string()
            })))
        }
    }

    /// Emits the session's completion record, best effort.
    async fn record(
        &self,
        session_id: &str,
        success: bool,
        error_type: Option<String>,
        attempts: u32,
        started: Instant,
    ) {
        let record = CompletionRecord {
            session_id: session_id.to_string(),
            success,
            error_type,
            attempts,
            latency_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.telemetry.record(record).await {
            warn!(error = %e, "failed to record completion");
        }
    }

}
