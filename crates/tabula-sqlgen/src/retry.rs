// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL error classification and bounded retry bookkeeping.
//!
//! Classification is keyword matching over the raw backend error text.
//! Column and table patterns are checked before connection patterns so a
//! message like "Unknown column 'x' (connection id 12)" classifies by its
//! root cause.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Classified root cause of a failed SQL attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SqlErrorType {
    SyntaxError,
    ColumnNotFound,
    TableNotFound,
    ConnectionError,
    PermissionError,
    TypeError,
    UnknownError,
}

impl SqlErrorType {
    /// Whether regenerating the SQL could plausibly fix this error.
    /// Connection and permission problems are infrastructure faults; a new
    /// statement cannot repair them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SqlErrorType::ConnectionError | SqlErrorType::PermissionError
        )
    }

    /// Human-readable remediation suggestion for this error type.
    pub fn remediation(&self) -> &'static str {
        match self {
            SqlErrorType::SyntaxError => {
                "Review the SQL syntax; simplify the statement and try again."
            }
            SqlErrorType::ColumnNotFound => {
                "Verify the column names with the check_columns tool before answering."
            }
            SqlErrorType::TableNotFound => {
                "Verify the table name with the list_tables tool before answering."
            }
            SqlErrorType::ConnectionError => {
                "Check data-source connectivity and credentials; the query itself is not at fault."
            }
            SqlErrorType::PermissionError => {
                "Request access to the referenced tables from the data-source administrator."
            }
            SqlErrorType::TypeError => {
                "Check the column types with the inspect_table tool and add explicit casts."
            }
            SqlErrorType::UnknownError => {
                "Inspect the raw error message; the failure did not match a known pattern."
            }
        }
    }
}

/// Classifies a raw backend error message.
pub fn classify_error(message: &str) -> SqlErrorType {
    let m = message.to_lowercase();
    if m.contains("unknown column")
        || m.contains("column not found")
        || m.contains("no such column")
    {
        SqlErrorType::ColumnNotFound
    } else if m.contains("no such table")
        || m.contains("table not found")
        || (m.contains("table") && (m.contains("doesn't exist") || m.contains("does not exist")))
    {
        SqlErrorType::TableNotFound
    } else if m.contains("syntax") || m.contains("parse error") {
        SqlErrorType::SyntaxError
    } else if m.contains("permission") || m.contains("access denied") || m.contains("denied") {
        SqlErrorType::PermissionError
    } else if m.contains("connection")
        || m.contains("timeout")
        || m.contains("timed out")
        || m.contains("refused")
    {
        SqlErrorType::ConnectionError
    } else if m.contains("type mismatch")
        || m.contains("incompatible type")
        || m.contains("cannot be cast")
        || m.contains("invalid type")
    {
        SqlErrorType::TypeError
    } else {
        SqlErrorType::UnknownError
    }
}

/// Retry bookkeeping for one generation session.
///
/// `increment_retry` is the only mutator; `can_retry()` holds for exactly
/// `max_retries` increments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRetryContext {
    pub placeholder_id: String,
    pub original_sql: String,
    pub error_message: String,
    pub error_type: SqlErrorType,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl SqlRetryContext {
    pub fn new(
        placeholder_id: impl Into<String>,
        sql: impl Into<String>,
        error_message: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        let error_message = error_message.into();
        let error_type = classify_error(&error_message);
        Self {
            placeholder_id: placeholder_id.into(),
            original_sql: sql.into(),
            error_message,
            error_type,
            retry_count: 0,
            max_retries,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
    }

    /// Targeted guidance appended to the regeneration prompt.
    pub fn guidance(&self) -> String {
        format!(
            "The previous attempt failed.\nSQL: {}\nError ({}): {}\nGuidance: {}",
            self.original_sql,
            self.error_type,
            self.error_message,
            self.error_type.remediation()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_column_errors() {
        assert_eq!(
            classify_error("Unknown column 'x' in 'field list'"),
            SqlErrorType::ColumnNotFound
        );
        assert_eq!(
            classify_error("no such column: discount"),
            SqlErrorType::ColumnNotFound
        );
    }

    #[test]
    fn classifies_table_errors() {
        assert_eq!(
            classify_error("Table 'y' doesn't exist"),
            SqlErrorType::TableNotFound
        );
        assert_eq!(
            classify_error("no such table: invoices"),
            SqlErrorType::TableNotFound
        );
    }

    #[test]
    fn classifies_connection_and_permission_errors() {
        assert_eq!(
            classify_error("Connection timeout"),
            SqlErrorType::ConnectionError
        );
        assert_eq!(
            classify_error("connection refused by host"),
            SqlErrorType::ConnectionError
        );
        assert_eq!(
            classify_error("Access denied for user 'ro'"),
            SqlErrorType::PermissionError
        );
    }

    #[test]
    fn classifies_syntax_and_type_errors() {
        assert_eq!(
            classify_error("You have an error in your SQL syntax"),
            SqlErrorType::SyntaxError
        );
        assert_eq!(
            classify_error("value cannot be cast to INTEGER"),
            SqlErrorType::TypeError
        );
    }

    #[test]
    fn unmatched_text_is_unknown() {
        assert_eq!(
            classify_error("something inexplicable happened"),
            SqlErrorType::UnknownError
        );
    }

    #[test]
    fn column_beats_connection_when_both_match() {
        assert_eq!(
            classify_error("Unknown column 'x' (connection id 12)"),
            SqlErrorType::ColumnNotFound
        );
    }

    #[test]
    fn fatal_types_are_connection_and_permission() {
        assert!(SqlErrorType::ConnectionError.is_fatal());
        assert!(SqlErrorType::PermissionError.is_fatal());
        assert!(!SqlErrorType::TableNotFound.is_fatal());
        assert!(!SqlErrorType::SyntaxError.is_fatal());
    }

    #[test]
    fn can_retry_holds_for_exactly_max_retries_increments() {
        let mut ctx = SqlRetryContext::new("p1", "SELECT 1", "syntax error", 2);
        assert!(ctx.can_retry());
        ctx.increment_retry();
        assert!(ctx.can_retry());
        ctx.increment_retry();
        assert!(!ctx.can_retry());
    }

    #[test]
    fn context_classifies_its_error_and_renders_guidance() {
        let ctx = SqlRetryContext::new("p1", "SELECT * FROM invoices", "no such table: invoices", 1);
        assert_eq!(ctx.error_type, SqlErrorType::TableNotFound);
        let guidance = ctx.guidance();
        assert!(guidance.contains("SELECT * FROM invoices"));
        assert!(guidance.contains("table_not_found"));
        assert!(guidance.contains("list_tables"));
    }

    #[test]
    fn error_type_serializes_snake_case() {
        assert_eq!(SqlErrorType::TableNotFound.to_string(), "table_not_found");
        assert_eq!(
            serde_json::to_string(&SqlErrorType::ColumnNotFound).unwrap(),
            "\"column_not_found\""
        );
    }
}
