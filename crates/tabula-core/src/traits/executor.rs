// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-source executor trait for SQL execution and schema discovery.

use async_trait::async_trait;

use crate::error::TabulaError;
use crate::types::{QueryResult, TableSchema};

/// Adapter for tabular data sources.
///
/// Used for dry-run validation and for schema discovery. Implementations
/// hold their own connection configuration and must normalize result rows
/// to field-name-keyed maps before they reach the core.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a SQL statement, optionally clamped to `limit` rows.
    ///
    /// Execution failures are reported in-band via [`QueryResult::fail`]
    /// so the caller can classify the backend error text; `Err` is reserved
    /// for adapter-level faults (e.g. the connection task died).
    async fn execute_query(
        &self,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult, TabulaError>;

    /// Lists table names (SHOW TABLES equivalent). Cheap; safe to call eagerly.
    async fn list_tables(&self) -> Result<Vec<String>, TabulaError>;

    /// Describes one table's columns (DESCRIBE equivalent).
    async fn describe_table(&self, table: &str) -> Result<TableSchema, TabulaError>;
}
