// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation of candidate SQL against the schema cache.
//!
//! Checks table existence for every FROM/JOIN reference and column
//! existence for qualified `table.column` (or `alias.column`) references.
//! Unqualified columns are left to the dry-run: resolving them statically
//! would require a full SQL parser and produces false positives with
//! aliases and expressions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tabula_core::TabulaError;

use crate::retriever::SchemaRetriever;

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlIssue {
    TableNotFound {
        table: String,
        /// Closest known table names, best first.
        suggestions: Vec<String>,
    },
    ColumnNotFound {
        table: String,
        column: String,
    },
}

impl std::fmt::Display for SqlIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlIssue::TableNotFound { table, suggestions } => {
                write!(f, "Table '{table}' doesn't exist")?;
                if !suggestions.is_empty() {
                    write!(f, " (did you mean: {})", suggestions.join(", "))?;
                }
                Ok(())
            }
            SqlIssue::ColumnNotFound { table, column } => {
                write!(f, "Unknown column '{column}' in table '{table}'")
            }
        }
    }
}

static TABLE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+(?:as\s+)?([A-Za-z_][A-Za-z0-9_]*))?")
        .expect("table reference pattern is valid")
});

static QUALIFIED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("qualified column pattern is valid")
});

/// SQL keywords that can trail a FROM/JOIN table and must not be taken
/// for an alias.
const NON_ALIAS_KEYWORDS: &[&str] = &[
    "where", "group", "order", "having", "limit", "on", "inner", "left", "right", "full",
    "cross", "join", "union", "select", "set",
];

/// Tables referenced in FROM/JOIN clauses, with their aliases.
///
/// Returns a map from alias (or the table name itself) to table name.
/// Iteration order is unspecified; callers that need source order should
/// scan the SQL themselves.
pub fn table_references(sql: &str) -> HashMap<String, String> {
    let mut refs = HashMap::new();
    for cap in TABLE_REF.captures_iter(sql) {
        let table = cap[1].to_lowercase();
        refs.insert(table.clone(), table.clone());
        if let Some(alias) = cap.get(2) {
            let alias = alias.as_str().to_lowercase();
            if !NON_ALIAS_KEYWORDS.contains(&alias.as_str()) {
                refs.insert(alias, table);
            }
        }
    }
    refs
}

/// Validates every table and qualified column reference in `sql` against
/// the retriever's schema knowledge. Loads metadata lazily for referenced
/// tables only.
pub async fn validate_references(
    retriever: &SchemaRetriever,
    sql: &str,
) -> Result<Vec<SqlIssue>, TabulaError> {
    let mut issues = Vec::new();
    let refs = table_references(sql);
    let known = retriever.table_names().await;

    let mut loaded: HashMap<String, std::sync::Arc<crate::cache::SchemaCacheEntry>> =
        HashMap::new();
    for table in refs.values() {
        if loaded.contains_key(table) {
            continue;
        }
        if !retriever.has_table(table).await {
            issues.push(SqlIssue::TableNotFound {
                table: table.clone(),
                suggestions: closest_tables(table, &known),
            });
            continue;
        }
        let entry = retriever.load_table(table).await?;
        loaded.insert(table.clone(), entry);
    }

    for cap in QUALIFIED_COLUMN.captures_iter(sql) {
        let qualifier = cap[1].to_lowercase();
        let column = cap[2].to_lowercase();
        let Some(table) = refs.get(&qualifier) else {
            // Not a reference to a table in this statement (could be a
            // schema qualifier or function namespace).
            continue;
        };
        let Some(entry) = loaded.get(table) else {
            continue; // table itself already reported missing
        };
        let exists = entry
            .schema
            .columns
            .iter()
            .any(|c| c.name.to_lowercase() == column);
        if !exists {
            issues.push(SqlIssue::ColumnNotFound {
                table: table.clone(),
                column,
            });
        }
    }

    Ok(issues)
}

/// Known table names ranked by Jaro-Winkler similarity to `table`,
/// keeping close matches only.
fn closest_tables(table: &str, known: &[String]) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = known
        .iter()
        .map(|k| (strsim::jaro_winkler(table, &k.to_lowercase()), k))
        .filter(|(s, _)| *s >= 0.75)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(3).map(|(_, k)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_references_finds_from_and_join() {
        let refs =
            table_references("SELECT * FROM orders o JOIN customers AS c ON o.cid = c.id");
        assert_eq!(refs.get("orders"), Some(&"orders".to_string()));
        assert_eq!(refs.get("o"), Some(&"orders".to_string()));
        assert_eq!(refs.get("c"), Some(&"customers".to_string()));
    }

    #[test]
    fn table_references_ignores_trailing_keywords() {
        let refs = table_references("SELECT count(*) FROM orders WHERE id > 1");
        assert_eq!(refs.len(), 1);
        assert!(refs.contains_key("orders"));
    }

    #[test]
    fn closest_tables_suggests_near_misses() {
        let known = vec!["orders".to_string(), "users".to_string()];
        let suggestions = closest_tables("order", &known);
        assert_eq!(suggestions, vec!["orders".to_string()]);
    }

    #[test]
    fn issue_display_matches_classifier_vocabulary() {
        let issue = SqlIssue::TableNotFound {
            table: "ordr".into(),
            suggestions: vec!["orders".into()],
        };
        let text = issue.to_string();
        assert!(text.contains("doesn't exist"));
        assert!(text.contains("orders"));

        let issue = SqlIssue::ColumnNotFound {
            table: "orders".into(),
            column: "custmer_id".into(),
        };
        assert!(issue.to_string().contains("Unknown column"));
    }
}
