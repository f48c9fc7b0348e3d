// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock data-source executor over in-memory table schemas.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tabula_core::traits::executor::QueryExecutor;
use tabula_core::{QueryResult, TableSchema, TabulaError};

/// A mock executor backed by a fixed set of table schemas.
///
/// `execute_query` pops scripted results from a FIFO queue, defaulting to an
/// empty successful result. Call counters allow cache behavior assertions.
pub struct MockExecutor {
    tables: Vec<TableSchema>,
    scripted: Arc<Mutex<VecDeque<QueryResult>>>,
    executed_sql: Arc<Mutex<Vec<String>>>,
    list_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

impl MockExecutor {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self {
            tables,
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            executed_sql: Arc::new(Mutex::new(Vec::new())),
            list_calls: AtomicUsize::new(0),
            describe_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a result for the next `execute_query` call.
    pub async fn push_result(&self, result: QueryResult) {
        self.scripted.lock().await.push_back(result);
    }

    /// SQL statements passed to `execute_query`, in call order.
    pub async fn executed_sql(&self) -> Vec<String> {
        self.executed_sql.lock().await.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute_query(
        &self,
        sql: &str,
        _limit: Option<usize>,
    ) -> Result<QueryResult, TabulaError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.executed_sql.lock().await.push(sql.to_string());
        Ok(self
            .scripted
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| QueryResult::ok(Vec::new())))
    }

    async fn list_tables(&self) -> Result<Vec<String>, TabulaError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.iter().map(|t| t.table_name.clone()).collect())
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema, TabulaError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .iter()
            .find(|t| t.table_name.eq_ignore_ascii_case(table))
            .cloned()
            .ok_or_else(|| TabulaError::executor(format!("Table '{table}' doesn't exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::ColumnInfo;

    fn orders() -> TableSchema {
        TableSchema {
            table_name: "orders".into(),
            columns: vec![ColumnInfo {
                name: "order_id".into(),
                column_type: "bigint".into(),
                comment: None,
            }],
            comment: None,
        }
    }

    #[tokio::test]
    async fn scripted_results_pop_in_order() {
        let executor = MockExecutor::new(vec![orders()]);
        executor.push_result(QueryResult::fail("syntax error near 'FORM'")).await;
        let first = executor.execute_query("FORM orders", None).await.unwrap();
        let second = executor.execute_query("SELECT 1", None).await.unwrap();
        assert!(!first.success);
        assert!(second.success);
        assert_eq!(executor.executed_sql().await.len(), 2);
    }

    #[tokio::test]
    async fn describe_unknown_table_errors() {
        let executor = MockExecutor::new(vec![orders()]);
        assert!(executor.describe_table("missing").await.is_err());
        assert_eq!(executor.describe_calls(), 1);
    }
}
