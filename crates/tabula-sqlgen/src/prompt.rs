// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for SQL generation sessions.

use tabula_core::TableSchema;

use crate::coordinator::TimeWindow;

/// Builds the system prompt for one generation attempt: workflow rules,
/// the schema excerpt, and the analysis time window.
pub fn sql_system_prompt(
    tables: &[TableSchema],
    time_window: &TimeWindow,
    guidance: Option<&str>,
) -> String {
    let mut lines = vec![
        "You are a SQL assistant that must follow this workflow:".to_string(),
        "- Use list_tables if you are unsure which tables exist.".to_string(),
        "- Use inspect_table on any table you are not certain about.".to_string(),
        "- Use check_sql to validate references before answering.".to_string(),
        "- Answer with a single read-only SELECT statement and nothing else.".to_string(),
        format!("- Restrict the analysis to the time window {time_window}."),
        String::new(),
        "Schema:".to_string(),
    ];
    for table in tables {
        lines.push(format_table(table));
    }
    if let Some(guidance) = guidance
        && !guidance.trim().is_empty()
    {
        lines.push(String::new());
        lines.push(guidance.trim().to_string());
    }
    lines.join("\n")
}

fn format_table(table: &TableSchema) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.column_type))
        .collect::<Vec<_>>()
        .join(", ");
    match &table.comment {
        Some(comment) => format!("- {} ({comment}): {columns}", table.table_name),
        None => format!("- {}: {columns}", table.table_name),
    }
}

/// Extracts the SQL statement from a model answer: the body of a fenced
/// block when present, the raw trimmed text otherwise.
pub fn extract_sql(content: &str) -> String {
    let trimmed = content.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim().to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tabula_core::ColumnInfo;

    fn window() -> TimeWindow {
        TimeWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        }
    }

    #[test]
    fn prompt_embeds_schema_and_window() {
        let tables = vec![TableSchema {
            table_name: "orders".into(),
            columns: vec![ColumnInfo {
                name: "customer_id".into(),
                column_type: "INTEGER".into(),
                comment: None,
            }],
            comment: Some("Sales orders".into()),
        }];
        let prompt = sql_system_prompt(&tables, &window(), None);
        assert!(prompt.contains("- orders (Sales orders): customer_id INTEGER"));
        assert!(prompt.contains("2024-01-01..2024-01-31"));
        assert!(prompt.contains("check_sql"));
    }

    #[test]
    fn guidance_is_appended_when_present() {
        let prompt = sql_system_prompt(&[], &window(), Some("Verify the table name."));
        assert!(prompt.ends_with("Verify the table name."));
    }

    #[test]
    fn extract_sql_unwraps_fenced_blocks() {
        assert_eq!(
            extract_sql("```sql\nSELECT 1\n```"),
            "SELECT 1"
        );
        assert_eq!(extract_sql("  SELECT 2  "), "SELECT 2");
        assert_eq!(
            extract_sql("Here you go:\n```sql\nSELECT 3\n```\nEnjoy."),
            "SELECT 3"
        );
    }
}
