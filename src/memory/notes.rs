//! Append-only free-text notes in the `memories` collection

use super::index::{Collection, SearchOutcome, SemanticIndex};
use super::ordinal::OrdinalId;
use crate::error::Result;

/// Index collection holding notes
pub const MEMORIES_COLLECTION: &str = "memories";

/// Free-text note store with similarity search
#[derive(Clone)]
pub struct MemoryStore {
    collection: Collection,
}

impl MemoryStore {
    pub fn new(index: &SemanticIndex) -> Self {
        Self {
            collection: index.collection(MEMORIES_COLLECTION),
        }
    }

    /// Store a note, returning its id
    pub fn store(&self, content: &str) -> Result<OrdinalId> {
        let id = self.collection.store(content)?;
        tracing::info!(id = %id, chars = content.chars().count(), "Memory stored");
        Ok(id)
    }

    /// Most similar notes first, at most `n_results`
    pub fn search(&self, query: &str, n_results: usize) -> Result<SearchOutcome> {
        self.collection.search(query, n_results)
    }

    pub fn count(&self) -> Result<usize> {
        self.collection.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embedder::HashingEmbedder;
    use crate::memory::index::DocumentMeta;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory_store(dir: &tempfile::TempDir) -> MemoryStore {
        let index = SemanticIndex::open(
            dir.path(),
            Arc::new(HashingEmbedder::default()),
            Duration::from_millis(500),
        )
        .unwrap();
        MemoryStore::new(&index)
    }

    #[test]
    fn test_store_then_search_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = memory_store(&dir);
        let id = store.store("Remember to deploy on Friday").unwrap();

        let SearchOutcome::Hits(hits) = store.search("deploy", 5).unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Remember to deploy on Friday");
        assert!(hits[0].similarity > 0.0);
        assert_eq!(hits[0].metadata, DocumentMeta::Note { stored_at: id });
    }

    #[test]
    fn test_search_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = memory_store(&dir);
        assert!(matches!(
            store.search("deploy", 5).unwrap(),
            SearchOutcome::EmptyIndex
        ));
    }

    #[test]
    fn test_ids_increase_with_each_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = memory_store(&dir);
        let a = store.store("first").unwrap();
        let b = store.store("second").unwrap();
        assert!(a < b);
        assert_eq!(store.count().unwrap(), 2);
    }
}
