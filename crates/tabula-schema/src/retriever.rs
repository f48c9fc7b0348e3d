// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema context retriever: lazy table discovery, relevance ranking, and
//! bounded-size context formatting.
//!
//! One retriever owns the schema cache for one data source. Initialization
//! loads only the table name list; column metadata is fetched the first
//! time a table is judged relevant to some query, and at most once per
//! process lifetime even under concurrent retrievals.

use std::sync::Arc;

use dashmap::DashMap;
use tabula_config::RetrievalConfig;
use tabula_core::{QueryExecutor, TabulaError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheStats, SchemaCache, SchemaCacheEntry};
use crate::scoring::{LexicalScorer, ScoringPolicy, Stage, TableSignals};

/// One ranked, formatted table context returned by [`SchemaRetriever::retrieve`].
#[derive(Debug, Clone)]
pub struct TableContext {
    pub table_name: String,
    pub score: f32,
    /// Bounded-length block: name, comment, column list with types/comments.
    pub block: String,
}

/// Schema-aware context retriever for a single data source.
pub struct SchemaRetriever {
    executor: Arc<dyn QueryExecutor>,
    config: RetrievalConfig,
    scorer: Box<dyn ScoringPolicy>,
    cache: SchemaCache,
    /// Discovered table names; populated by [`initialize`].
    ///
    /// [`initialize`]: SchemaRetriever::initialize
    table_names: RwLock<Vec<String>>,
    /// Usage signal per table, recorded when a generation validates.
    usage: DashMap<String, u64>,
}

impl SchemaRetriever {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: RetrievalConfig) -> Self {
        Self::with_scorer(executor, config, Box::new(LexicalScorer::default()))
    }

    pub fn with_scorer(
        executor: Arc<dyn QueryExecutor>,
        config: RetrievalConfig,
        scorer: Box<dyn ScoringPolicy>,
    ) -> Self {
        Self {
            executor,
            config,
            scorer,
            cache: SchemaCache::new(),
            table_names: RwLock::new(Vec::new()),
            usage: DashMap::new(),
        }
    }

    /// Discovers table names. Cheap; never loads column metadata.
    pub async fn initialize(&self) -> Result<(), TabulaError> {
        let names = self.executor.list_tables().await?;
        debug!(count = names.len(), "discovered tables");
        *self.table_names.write().await = names;
        Ok(())
    }

    /// Known table names (empty until [`initialize`] runs).
    ///
    /// [`initialize`]: SchemaRetriever::initialize
    pub async fn table_names(&self) -> Vec<String> {
        self.table_names.read().await.clone()
    }

    /// True if `table` was discovered during initialization.
    pub async fn has_table(&self, table: &str) -> bool {
        let lowered = table.to_lowercase();
        self.table_names
            .read()
            .await
            .iter()
            .any(|t| t.to_lowercase() == lowered)
    }

    /// Loads (or fetches from cache) the metadata for one table.
    ///
    /// Concurrent callers coalesce onto a single underlying load.
    pub async fn load_table(&self, table: &str) -> Result<Arc<SchemaCacheEntry>, TabulaError> {
        let executor = self.executor.clone();
        let name = table.to_string();
        self.cache
            .get_or_load(table, move || async move {
                executor.describe_table(&name).await
            })
            .await
    }

    /// Records that `table` appeared in a validated generation, boosting
    /// its future relevance.
    pub fn record_usage(&self, table: &str) {
        *self.usage.entry(table.to_string()).or_insert(0) += 1;
    }

    /// Ranks known tables against `query` and returns the top `top_k`
    /// distinct tables as bounded formatted blocks, loading column
    /// metadata lazily for the winners only.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        stage: Stage,
    ) -> Result<Vec<TableContext>, TabulaError> {
        let names = self.table_names.read().await.clone();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        // Score against whatever is already cached; scoring must not load.
        let mut ranked: Vec<(String, f32)> = names
            .iter()
            .map(|name| {
                let cached = self.cache.peek(name);
                let uses = self.usage.get(name).map(|u| *u).unwrap_or(0);
                let score = match cached {
                    Some(ref entry) => self.scorer.score(
                        query,
                        &TableSignals {
                            table_name: name,
                            comment: entry.schema.comment.as_deref(),
                            columns: &entry.schema.columns,
                            uses,
                        },
                        stage,
                    ),
                    None => self.scorer.score(
                        query,
                        &TableSignals {
                            table_name: name,
                            comment: None,
                            columns: &[],
                            uses,
                        },
                        stage,
                    ),
                };
                (name.clone(), score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        let mut contexts = Vec::with_capacity(ranked.len());
        for (name, score) in ranked {
            match self.load_table(&name).await {
                Ok(entry) => {
                    let block = format_block(&entry.schema, self.config.max_block_chars);
                    contexts.push(TableContext {
                        table_name: name,
                        score,
                        block,
                    });
                }
                Err(e) => {
                    // A table that cannot be described is dropped from the
                    // context rather than failing the whole retrieval.
                    warn!(table = %name, error = %e, "failed to load table metadata");
                }
            }
        }
        Ok(contexts)
    }

    /// Cache statistics for observability.
    pub async fn cache_stats(&self) -> CacheStats {
        let (hits, misses, loads) = self.cache.counters();
        CacheStats {
            tables_known: self.table_names.read().await.len(),
            tables_loaded: self.cache.loaded_count(),
            hits,
            misses,
            loads,
        }
    }

    /// Drops all cached metadata; the next access per table loads again.
    pub fn reset_cache(&self) {
        self.cache.reset();
    }
}

/// Formats one table block, truncating the column list to stay within
/// `max_chars`.
fn format_block(schema: &tabula_core::TableSchema, max_chars: usize) -> String {
    let mut block = format!("Table: {}", schema.table_name);
    if let Some(ref comment) = schema.comment {
        block.push_str(&format!(" -- {comment}"));
    }
    block.push('\n');

    let mut truncated = 0usize;
    for column in &schema.columns {
        let mut line = format!("  {} {}", column.name, column.column_type);
        if let Some(ref comment) = column.comment {
            line.push_str(&format!(" -- {comment}"));
        }
        line.push('\n');
        if block.len() + line.len() > max_chars {
            truncated += 1;
            continue;
        }
        block.push_str(&line);
    }
    if truncated > 0 {
        block.push_str(&format!("  ... {truncated} more columns\n"));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{ColumnInfo, TableSchema};
    use tabula_test_utils::MockExecutor;

    fn orders_schema() -> TableSchema {
        TableSchema {
            table_name: "orders".into(),
            columns: vec![
                ColumnInfo {
                    name: "order_id".into(),
                    column_type: "bigint".into(),
                    comment: None,
                },
                ColumnInfo {
                    name: "customer_id".into(),
                    column_type: "bigint".into(),
                    comment: Some("buyer".into()),
                },
            ],
            comment: Some("sales orders".into()),
        }
    }

    fn users_schema() -> TableSchema {
        TableSchema {
            table_name: "users".into(),
            columns: vec![ColumnInfo {
                name: "user_id".into(),
                column_type: "bigint".into(),
                comment: None,
            }],
            comment: None,
        }
    }

    fn retriever(executor: Arc<MockExecutor>) -> SchemaRetriever {
        SchemaRetriever::new(executor, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn initialize_discovers_names_without_loading_columns() {
        let executor = Arc::new(MockExecutor::new(vec![orders_schema(), users_schema()]));
        let r = retriever(executor.clone());
        r.initialize().await.unwrap();

        let stats = r.cache_stats().await;
        assert_eq!(stats.tables_known, 2);
        assert_eq!(stats.tables_loaded, 0);
        assert_eq!(executor.describe_calls(), 0);
    }

    #[tokio::test]
    async fn retrieve_loads_only_relevant_tables_once() {
        let executor = Arc::new(MockExecutor::new(vec![orders_schema(), users_schema()]));
        let r = retriever(executor.clone());
        r.initialize().await.unwrap();

        let contexts = r
            .retrieve("count of orders", 1, Stage::SqlGeneration)
            .await
            .unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].table_name, "orders");
        assert!(contexts[0].block.contains("customer_id"));
        assert_eq!(executor.describe_calls(), 1);

        // Repeat query: cache hit, no second metadata load.
        r.retrieve("count of orders", 1, Stage::SqlGeneration)
            .await
            .unwrap();
        assert_eq!(executor.describe_calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_retrievals_coalesce_the_load() {
        let executor = Arc::new(MockExecutor::new(vec![orders_schema()]));
        let r = Arc::new(retriever(executor.clone()));
        r.initialize().await.unwrap();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let r = r.clone();
                tokio::spawn(async move {
                    r.retrieve("orders", 1, Stage::SqlGeneration).await.unwrap()
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(executor.describe_calls(), 1);

        let stats = r.cache_stats().await;
        assert_eq!(stats.loads, 1);
    }

    #[tokio::test]
    async fn irrelevant_query_returns_empty() {
        let executor = Arc::new(MockExecutor::new(vec![orders_schema()]));
        let r = retriever(executor);
        r.initialize().await.unwrap();
        let contexts = r
            .retrieve("weather forecast tomorrow", 3, Stage::Narrative)
            .await
            .unwrap();
        assert!(contexts.is_empty());
    }

    #[tokio::test]
    async fn usage_signal_reorders_ties() {
        let mut orders2 = orders_schema();
        orders2.table_name = "orders_archive".into();
        let executor = Arc::new(MockExecutor::new(vec![orders_schema(), orders2]));
        let r = retriever(executor);
        r.initialize().await.unwrap();
        r.record_usage("orders");

        let contexts = r
            .retrieve("orders", 2, Stage::SqlGeneration)
            .await
            .unwrap();
        assert_eq!(contexts[0].table_name, "orders");
    }

    #[test]
    fn format_block_truncates_oversized_column_lists() {
        let mut schema = orders_schema();
        for i in 0..200 {
            schema.columns.push(ColumnInfo {
                name: format!("extra_column_number_{i}"),
                column_type: "varchar(255)".into(),
                comment: None,
            });
        }
        let block = format_block(&schema, 500);
        assert!(block.len() <= 560, "block stayed near the cap");
        assert!(block.contains("more columns"));
    }
}
