// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`QueryExecutor`].
//!
//! Wraps `tokio-rusqlite` so blocking SQLite work stays off the async
//! runtime. Rows are normalized to field-name-keyed JSON maps before they
//! reach the core; query failures are reported in-band via
//! [`QueryResult::fail`], while `Err` is reserved for connection-level
//! faults.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tabula_core::{ColumnInfo, QueryExecutor, QueryResult, TableSchema, TabulaError};
use tracing::debug;

/// Query executor over a single SQLite database.
pub struct SqliteExecutor {
    conn: tokio_rusqlite::Connection,
}

impl SqliteExecutor {
    /// Opens (or creates) a database file in WAL mode so reads never block
    /// behind a writer.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TabulaError> {
        let conn = tokio_rusqlite::Connection::open(path.as_ref())
            .await
            .map_err(connection_error)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            Ok(())
        })
        .await
        .map_err(call_error)?;
        Ok(Self { conn })
    }

    /// Opens a fresh in-memory database.
    pub async fn open_in_memory() -> Result<Self, TabulaError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(connection_error)?;
        Ok(Self { conn })
    }

    /// Runs arbitrary non-SELECT statements, for setup and tests.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), TabulaError> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> { conn.execute_batch(&sql) })
            .await
            .map_err(call_error)
    }
}

fn connection_error(e: impl std::fmt::Display) -> TabulaError {
    TabulaError::executor(format!("Connection error: {e}"))
}

/// Splits `call` failures: statement errors keep their own message,
/// channel/close faults read as connection errors.
fn call_error(e: tokio_rusqlite::Error) -> TabulaError {
    match e {
        tokio_rusqlite::Error::Error(e) => TabulaError::executor(e.to_string()),
        other => connection_error(other),
    }
}

/// Wraps a statement so the executor-level row cap applies regardless of
/// what the statement itself selects.
fn apply_limit(sql: &str, limit: Option<usize>) -> String {
    let trimmed = sql.trim().trim_end_matches(';');
    match limit {
        Some(n) => format!("SELECT * FROM ({trimmed}) LIMIT {n}"),
        None => trimmed.to_string(),
    }
}

fn run_query(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<Map<String, Value>>, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    // Generated SQL must never mutate the database.
    if !stmt.readonly() {
        return Err("only read-only statements are allowed".to_string());
    }
    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut run = || -> Result<Vec<Map<String, Value>>, rusqlite::Error> {
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Map::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    };
    run().map_err(|e| e.to_string())
}

fn value_to_json(value: rusqlite::types::ValueRef<'_>) -> Value {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute_query(
        &self,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult, TabulaError> {
        let effective = apply_limit(sql, limit);
        debug!(sql = %effective, "executing query");
        let outcome = self
            .conn
            .call(move |conn| -> Result<_, rusqlite::Error> { Ok(run_query(conn, &effective)) })
            .await
            .map_err(call_error)?;
        Ok(match outcome {
            Ok(rows) => QueryResult::ok(rows),
            Err(e) => QueryResult::fail(e),
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>, TabulaError> {
        self.conn
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(call_error)
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema, TabulaError> {
        let name = table.to_string();
        let result = self
            .conn
            .call(move |conn| -> Result<TableSchema, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
                let columns = stmt
                    .query_map([&name], |row| {
                        Ok(ColumnInfo {
                            name: row.get(0)?,
                            column_type: row.get(1)?,
                            comment: None,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TableSchema {
                    table_name: name.clone(),
                    columns,
                    comment: None,
                })
            })
            .await
            .map_err(call_error)?;

        if result.columns.is_empty() {
            return Err(TabulaError::executor(format!(
                "Table '{table}' doesn't exist"
            )));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqliteExecutor {
        let db = SqliteExecutor::open_in_memory().await.unwrap();
        db.execute_batch(
            "CREATE TABLE orders (order_id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
             CREATE TABLE customers (customer_id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO orders VALUES (1, 10, 99.5), (2, 10, 3.0), (3, 11, 12.25);",
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn file_backed_database_runs_in_wal_mode() {
        let path = std::env::temp_dir().join(format!("tabula-wal-{}.db", std::process::id()));
        let db = SqliteExecutor::open(&path).await.unwrap();
        let result = db
            .execute_query("SELECT * FROM pragma_journal_mode", None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.rows[0]["journal_mode"], "wal");
        drop(db);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn lists_tables_sorted() {
        let db = seeded().await;
        assert_eq!(db.list_tables().await.unwrap(), ["customers", "orders"]);
    }

    #[tokio::test]
    async fn describes_columns_in_declaration_order() {
        let db = seeded().await;
        let schema = db.describe_table("orders").await.unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["order_id", "customer_id", "total"]);
        assert_eq!(schema.columns[2].column_type, "REAL");
    }

    #[tokio::test]
    async fn describing_a_missing_table_errors() {
        let db = seeded().await;
        let err = db.describe_table("invoices").await.unwrap_err();
        assert!(err.to_string().contains("Table 'invoices' doesn't exist"));
    }

    #[tokio::test]
    async fn rows_are_name_keyed_maps() {
        let db = seeded().await;
        let result = db
            .execute_query(
                "SELECT COUNT(DISTINCT customer_id) AS buyers FROM orders",
                None,
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.rows[0]["buyers"], 2);
    }

    #[tokio::test]
    async fn limit_caps_returned_rows() {
        let db = seeded().await;
        let result = db
            .execute_query("SELECT * FROM orders", Some(1))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.rows.len(), 1);
    }

    #[tokio::test]
    async fn write_statements_are_rejected_in_band() {
        let db = seeded().await;
        let result = db
            .execute_query("DELETE FROM orders", None)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("read-only"));
        // Nothing was deleted.
        let count = db
            .execute_query("SELECT COUNT(*) AS n FROM orders", None)
            .await
            .unwrap();
        assert_eq!(count.rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn sql_failures_are_reported_in_band() {
        let db = seeded().await;
        let result = db
            .execute_query("SELECT nope FROM orders", Some(1))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("nope"));
    }
}
