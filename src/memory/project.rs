//! Store handles for one project's memory root
//!
//! Built once at process start and passed by reference to whatever
//! dispatches operations. Nothing here is global.

use super::embedder::{Embedder, HashingEmbedder};
use super::facts::FactStore;
use super::index::SemanticIndex;
use super::notes::MemoryStore;
use super::sessions::SessionStore;
use super::structured::StructuredStore;
use crate::config::MemoryConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// All stores rooted at one memory directory
#[derive(Clone)]
pub struct ProjectMemory {
    root: PathBuf,
    pub facts: FactStore,
    pub notes: MemoryStore,
    pub sessions: SessionStore,
}

impl ProjectMemory {
    /// Open the stores under `memory_root` with the configured local embedder
    pub fn open(memory_root: &Path, config: &MemoryConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(config.index.dimension));
        Self::open_with_embedder(memory_root, config, embedder)
    }

    /// Open the stores with a caller-supplied embedding engine
    pub fn open_with_embedder(
        memory_root: &Path,
        config: &MemoryConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let busy_timeout = Duration::from_millis(config.storage.busy_timeout_ms);
        let index = SemanticIndex::open(
            &config.storage.index_path(memory_root),
            embedder,
            busy_timeout,
        )?;
        let table = StructuredStore::new(config.storage.database_path(memory_root), busy_timeout);

        tracing::info!(
            root = %memory_root.display(),
            database = %table.path().display(),
            "Opened project memory"
        );
        Ok(Self {
            root: memory_root.to_path_buf(),
            facts: FactStore::new(table.clone()),
            notes: MemoryStore::new(&index),
            sessions: SessionStore::new(table, &index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
