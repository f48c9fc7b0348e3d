// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-aware context retrieval for the Tabula agent runtime.
//!
//! Owns a per-data-source cache of table/column metadata: discovers table
//! names cheaply at initialization, defers column loading until a table is
//! actually relevant, scores relevance of tables against a natural-language
//! query, and formats bounded-size context blocks for prompt injection.

pub mod cache;
pub mod retriever;
pub mod scoring;
pub mod validate;

pub use cache::{CacheStats, SchemaCacheEntry};
pub use retriever::{SchemaRetriever, TableContext};
pub use scoring::{LexicalScorer, ScoringPolicy, Stage, TableSignals};
pub use validate::{SqlIssue, table_references, validate_references};
