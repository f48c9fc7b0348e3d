// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance scoring of tables against a natural-language query.
//!
//! The exact weighting is a tunable policy behind [`ScoringPolicy`]; the
//! default [`LexicalScorer`] combines token overlap, Jaro-Winkler fuzzy
//! matching on the table name, and a recorded usage signal, with
//! stage-dependent weighting.

use strum::Display;
use tabula_core::ColumnInfo;

/// Pipeline stage requesting context. Biases scoring without reloading
/// the underlying cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    SqlGeneration,
    Chart,
    Narrative,
}

/// Everything the scorer may know about a table. `columns` is empty when
/// the table's metadata has not been loaded yet; scoring never triggers a
/// load.
#[derive(Debug, Clone)]
pub struct TableSignals<'a> {
    pub table_name: &'a str,
    pub comment: Option<&'a str>,
    pub columns: &'a [ColumnInfo],
    /// Times this table appeared in a validated generation.
    pub uses: u64,
}

/// Tunable relevance policy: higher is more relevant, <= 0.0 is irrelevant.
pub trait ScoringPolicy: Send + Sync {
    fn score(&self, query: &str, table: &TableSignals<'_>, stage: Stage) -> f32;
}

/// Default lexical scorer.
pub struct LexicalScorer {
    name_weight: f32,
    column_weight: f32,
    comment_weight: f32,
    fuzzy_weight: f32,
    usage_weight: f32,
}

/// Minimum Jaro-Winkler similarity between a query token and the table
/// name before the fuzzy bonus applies.
const FUZZY_THRESHOLD: f64 = 0.85;

impl Default for LexicalScorer {
    fn default() -> Self {
        Self {
            name_weight: 1.0,
            column_weight: 0.5,
            comment_weight: 0.25,
            fuzzy_weight: 0.8,
            usage_weight: 0.3,
        }
    }
}

impl ScoringPolicy for LexicalScorer {
    fn score(&self, query: &str, table: &TableSignals<'_>, stage: Stage) -> f32 {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return 0.0;
        }

        // The SQL stage weights column names up; presentation stages weight
        // human-facing comments up.
        let (column_weight, comment_weight) = match stage {
            Stage::SqlGeneration => (self.column_weight * 2.0, self.comment_weight),
            Stage::Chart | Stage::Narrative => (self.column_weight, self.comment_weight * 2.0),
        };

        let name_tokens = tokenize(table.table_name);
        let comment_tokens = table.comment.map(tokenize).unwrap_or_default();
        let column_tokens: Vec<String> = table
            .columns
            .iter()
            .flat_map(|c| {
                let mut t = tokenize(&c.name);
                if let Some(ref comment) = c.comment {
                    t.extend(tokenize(comment));
                }
                t
            })
            .collect();

        let mut score = 0.0f32;
        for token in &query_tokens {
            if name_tokens.iter().any(|t| t == token) {
                score += self.name_weight;
            } else if strsim::jaro_winkler(token, &table.table_name.to_lowercase())
                >= FUZZY_THRESHOLD
            {
                score += self.fuzzy_weight;
            }
            if column_tokens.iter().any(|t| t == token) {
                score += column_weight;
            }
            if comment_tokens.iter().any(|t| t == token) {
                score += comment_weight;
            }
        }

        if score > 0.0 {
            score += (1.0 + table.uses as f32).ln() * self.usage_weight;
        }
        score
    }
}

/// Lowercased tokens: splits on non-alphanumeric boundaries, so both
/// `customer_id` and `CustomerId`-style names yield `customer` and `id`.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && !current.is_empty() {
                tokens.push(std::mem::take(&mut current).to_lowercase());
            }
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current).to_lowercase());
        }
    }
    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }
    tokens
}
