use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Where raw mapping documents come from.
#[async_trait]
pub trait MappingSource: Send + Sync {
    async fn load(&self, name: &str) -> Result<String>;
}

/// Reads `<root>/<name>` from disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MappingSource for DirectorySource {
    async fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        tracing::debug!(path = %path.display(), "Reading mapping config");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::ConfigLoad {
                name: name.to_string(),
                message: format!("{}: {}", path.display(), e),
            })
    }
}

/// In-memory documents, counting loads. Useful for tests and tooling.
#[derive(Debug, Default)]
pub struct StaticSource {
    documents: HashMap<String, String>,
    loads: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.insert(name.into(), text.into());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MappingSource for StaticSource {
    async fn load(&self, name: &str) -> Result<String> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ConfigLoad {
                name: name.to_string(),
                message: "no such document".to_string(),
            })
    }
}
