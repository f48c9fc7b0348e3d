// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry sink trait for structured completion/failure records.

use async_trait::async_trait;

use crate::error::TabulaError;
use crate::types::CompletionRecord;

/// Sink for structured completion records (attempt count, error type,
/// latency). The core emits these for external logging/metrics and never
/// persists anything itself.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, record: CompletionRecord) -> Result<(), TabulaError>;
}

/// Sink that logs records via `tracing` and drops them.
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn record(&self, record: CompletionRecord) -> Result<(), TabulaError> {
        tracing::info!(
            session_id = %record.session_id,
            success = record.success,
            error_type = record.error_type.as_deref().unwrap_or("none"),
            attempts = record.attempts,
            latency_ms = record.latency_ms,
            "generation session completed"
        );
        Ok(())
    }
}
