// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools backed by the schema retriever.
//!
//! Four capabilities are exposed to the model: listing known tables,
//! inspecting one table's columns, checking that specific columns exist,
//! and validating the table/column references of a SQL draft. All of them
//! answer in plain text so results drop straight into the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use tabula_core::TabulaError;
use tabula_schema::{validate_references, SchemaRetriever};

use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput, ToolRegistry};

/// Registers the built-in schema tools on a registry.
pub fn register_builtin_tools(registry: &mut ToolRegistry, retriever: Arc<SchemaRetriever>) {
    registry.register(Arc::new(ListTablesTool {
        retriever: retriever.clone(),
    }));
    registry.register(Arc::new(InspectTableTool {
        retriever: retriever.clone(),
    }));
    registry.register(Arc::new(CheckColumnsTool {
        retriever: retriever.clone(),
    }));
    registry.register(Arc::new(CheckSqlTool { retriever }));
}

/// Lists every table known to the data source.
pub struct ListTablesTool {
    retriever: Arc<SchemaRetriever>,
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "list_tables"
    }

    fn description(&self) -> &str {
        "Lists all tables available in the data source"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![]
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    async fn invoke(
        &self,
        _arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, TabulaError> {
        let names = self.retriever.table_names().await;
        if names.is_empty() {
            return Ok(ToolOutput::ok("No tables found in the data source."));
        }
        Ok(ToolOutput::ok(format!("Tables: {}", names.join(", "))))
    }
}

/// Returns one table's column names, types, and comments.
pub struct InspectTableTool {
    retriever: Arc<SchemaRetriever>,
}

#[async_trait]
impl Tool for InspectTableTool {
    fn name(&self) -> &str {
        "inspect_table"
    }

    fn description(&self) -> &str {
        "Returns the columns of a table with their types and comments"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "table",
            ParamType::String,
            "Name of the table to inspect",
        )]
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"table": "orders"})
    }

    async fn invoke(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, TabulaError> {
        let table = arguments
            .get("table")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if !self.retriever.has_table(table).await {
            return Ok(ToolOutput::error(format!(
                "Table '{table}' doesn't exist"
            )));
        }
        let entry = self.retriever.load_table(table).await?;
        self.retriever.record_usage(&entry.schema.table_name);

        let mut out = format!("Table {}", entry.schema.table_name);
        if let Some(comment) = &entry.schema.comment {
            out.push_str(&format!(" ({comment})"));
        }
        out.push('\n');
        for col in &entry.schema.columns {
            out.push_str(&format!("- {} {}", col.name, col.column_type));
            if let Some(comment) = &col.comment {
                out.push_str(&format!(": {comment}"));
            }
            out.push('\n');
        }
        Ok(ToolOutput::ok(out))
    }
}

/// Checks that named columns exist in a table.
pub struct CheckColumnsTool {
    retriever: Arc<SchemaRetriever>,
}

#[async_trait]
impl Tool for CheckColumnsTool {
    fn name(&self) -> &str {
        "check_columns"
    }

    fn description(&self) -> &str {
        "Checks whether the given columns exist in a table"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("table", ParamType::String, "Table to check against"),
            ParamSpec::required("columns", ParamType::Array, "Column names to verify"),
        ]
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"table": "orders", "columns": ["customer_id", "total"]})
    }

    async fn invoke(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, TabulaError> {
        let table = arguments
            .get("table")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let columns: Vec<String> = arguments
            .get("columns")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if !self.retriever.has_table(table).await {
            return Ok(ToolOutput::error(format!(
                "Table '{table}' doesn't exist"
            )));
        }
        let entry = self.retriever.load_table(table).await?;
        let missing: Vec<&String> = columns
            .iter()
            .filter(|c| {
                !entry
                    .schema
                    .columns
                    .iter()
                    .any(|k| k.name.eq_ignore_ascii_case(c))
            })
            .collect();
        if missing.is_empty() {
            return Ok(ToolOutput::ok(format!(
                "All {} columns exist in {}.",
                columns.len(),
                entry.schema.table_name
            )));
        }
        let report = missing
            .iter()
            .map(|c| format!("Unknown column '{c}' in table '{}'", entry.schema.table_name))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::error(report))
    }
}

/// Validates the table and qualified column references of a SQL draft.
pub struct CheckSqlTool {
    retriever: Arc<SchemaRetriever>,
}

#[async_trait]
impl Tool for CheckSqlTool {
    fn name(&self) -> &str {
        "check_sql"
    }

    fn description(&self) -> &str {
        "Validates the table and column references of a SQL statement without running it"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "sql",
            ParamType::String,
            "SQL statement to validate",
        )]
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"sql": "SELECT o.total FROM orders o"})
    }

    async fn invoke(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, TabulaError> {
        let sql = arguments
            .get("sql")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let issues = validate_references(&self.retriever, sql).await?;
        if issues.is_empty() {
            return Ok(ToolOutput::ok("All table and column references resolve."));
        }
        let report = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::error(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_config::RetrievalConfig;
    use tabula_core::{ColumnInfo, TableSchema, ToolCall};
    use tabula_test_utils::MockExecutor;

    fn orders_schema() -> TableSchema {
        TableSchema {
            table_name: "orders".into(),
            columns: vec![
                ColumnInfo {
                    name: "id".into(),
                    column_type: "INTEGER".into(),
                    comment: None,
                },
                ColumnInfo {
                    name: "customer_id".into(),
                    column_type: "INTEGER".into(),
                    comment: Some("FK to customers".into()),
                },
                ColumnInfo {
                    name: "total".into(),
                    column_type: "REAL".into(),
                    comment: None,
                },
            ],
            comment: Some("Sales orders".into()),
        }
    }

    async fn registry_with_tools() -> ToolRegistry {
        let executor = Arc::new(MockExecutor::new(vec![orders_schema()]));
        let retriever = Arc::new(SchemaRetriever::new(executor, RetrievalConfig::default()));
        retriever.initialize().await.unwrap();
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, retriever);
        registry
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        let arguments = match args {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        ToolCall {
            id: "t1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn list_tables_reports_known_tables() {
        let registry = registry_with_tools().await;
        let out = registry
            .dispatch(&call("list_tables", serde_json::json!({})))
            .await;
        assert!(!out.is_error);
        assert!(out.content.contains("orders"));
    }

    #[tokio::test]
    async fn inspect_table_lists_columns() {
        let registry = registry_with_tools().await;
        let out = registry
            .dispatch(&call(
                "inspect_table",
                serde_json::json!({"table": "orders"}),
            ))
            .await;
        assert!(!out.is_error);
        assert!(out.content.contains("customer_id INTEGER: FK to customers"));
        assert!(out.content.contains("Sales orders"));
    }

    #[tokio::test]
    async fn inspect_table_rejects_unknown_table() {
        let registry = registry_with_tools().await;
        let out = registry
            .dispatch(&call(
                "inspect_table",
                serde_json::json!({"table": "invoices"}),
            ))
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("Table 'invoices' doesn't exist"));
    }

    #[tokio::test]
    async fn check_columns_reports_missing_columns() {
        let registry = registry_with_tools().await;
        let out = registry
            .dispatch(&call(
                "check_columns",
                serde_json::json!({"table": "orders", "columns": ["total", "discount"]}),
            ))
            .await;
        assert!(out.is_error);
        assert!(out
            .content
            .contains("Unknown column 'discount' in table 'orders'"));
    }

    #[tokio::test]
    async fn check_sql_flags_unknown_references() {
        let registry = registry_with_tools().await;
        let ok = registry
            .dispatch(&call(
                "check_sql",
                serde_json::json!({"sql": "SELECT o.total FROM orders o"}),
            ))
            .await;
        assert!(!ok.is_error);

        let bad = registry
            .dispatch(&call(
                "check_sql",
                serde_json::json!({"sql": "SELECT i.total FROM invoices i"}),
            ))
            .await;
        assert!(bad.is_error);
        assert!(bad.content.contains("Table 'invoices' doesn't exist"));
    }
}
