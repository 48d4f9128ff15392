//! Process-wide cache of parsed mapping tables
//!
//! Each table is loaded on first access and kept until [`MappingStore::reset`].
//! Concurrent first accesses for the same name share a single load.

use crate::error::Result;
use crate::loader::MappingSource;
use crate::table::MappingTable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

pub struct MappingStore {
    source: Arc<dyn MappingSource>,
    cache: RwLock<HashMap<String, Arc<OnceCell<MappingTable>>>>,
}

impl MappingStore {
    pub fn new(source: Arc<dyn MappingSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the parsed table, loading it once per name.
    ///
    /// A failed load is not cached; the next access retries.
    pub async fn get(&self, name: &str) -> Result<MappingTable> {
        let cell = self.cell(name).await;
        let table = cell
            .get_or_try_init(|| async {
                tracing::info!(config = name, "Loading mapping config");
                let text = self.source.load(name).await?;
                MappingTable::parse(name, &text)
            })
            .await?;
        Ok(table.clone())
    }

    async fn cell(&self, name: &str) -> Arc<OnceCell<MappingTable>> {
        if let Some(cell) = self.cache.read().await.get(name) {
            return cell.clone();
        }
        let mut cache = self.cache.write().await;
        cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Drops every cached table so the next access reloads from the source.
    pub async fn reset(&self) {
        self.cache.write().await.clear();
    }
}

impl std::fmt::Debug for MappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingStore").finish_non_exhaustive()
    }
}
