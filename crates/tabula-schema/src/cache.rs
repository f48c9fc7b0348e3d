// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy per-table metadata cache with coalesced loads.
//!
//! Each table's metadata lives behind a per-key `OnceCell`: concurrent
//! requests for the same unloaded table run the loader exactly once, and
//! every later request is a cache hit. Entries are invalidated only by
//! process restart or an explicit [`SchemaCache::reset`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tabula_core::{TableSchema, TabulaError};
use tokio::sync::OnceCell;

/// Cached metadata for one table.
#[derive(Debug, Clone)]
pub struct SchemaCacheEntry {
    pub schema: TableSchema,
    pub loaded_at: DateTime<Utc>,
}

/// Counters exposed by [`crate::SchemaRetriever::cache_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Tables whose names are known (discovered at initialization).
    pub tables_known: usize,
    /// Tables whose column metadata has been loaded.
    pub tables_loaded: usize,
    pub hits: u64,
    pub misses: u64,
    /// Underlying metadata loads actually executed.
    pub loads: u64,
}

pub(crate) struct SchemaCache {
    cells: DashMap<String, Arc<OnceCell<Arc<SchemaCacheEntry>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl SchemaCache {
    pub(crate) fn new() -> Self {
        Self {
            cells: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    fn cell(&self, table: &str) -> Arc<OnceCell<Arc<SchemaCacheEntry>>> {
        self.cells
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Returns the cached entry, loading it via `load` if absent.
    ///
    /// Concurrent callers for the same key coalesce onto a single load.
    pub(crate) async fn get_or_load<F, Fut>(
        &self,
        table: &str,
        load: F,
    ) -> Result<Arc<SchemaCacheEntry>, TabulaError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TableSchema, TabulaError>>,
    {
        let cell = self.cell(table);
        if let Some(entry) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let loads = &self.loads;
        let entry = cell
            .get_or_try_init(|| async {
                loads.fetch_add(1, Ordering::Relaxed);
                let schema = load().await?;
                Ok::<_, TabulaError>(Arc::new(SchemaCacheEntry {
                    schema,
                    loaded_at: Utc::now(),
                }))
            })
            .await?;
        Ok(entry.clone())
    }

    /// Returns the cached entry without loading. Does not count as a hit.
    pub(crate) fn peek(&self, table: &str) -> Option<Arc<SchemaCacheEntry>> {
        self.cells
            .get(table)
            .and_then(|cell| cell.get().cloned())
    }

    pub(crate) fn loaded_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub(crate) fn counters(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.loads.load(Ordering::Relaxed),
        )
    }

    /// Drops every cached entry. The next access per table loads again.
    pub(crate) fn reset(&self) {
        self.cells.clear();
    }
}
