//! Semantic index: named collections of embedded documents
//!
//! Documents live in `<index_dir>/index.sqlite3`, one row per
//! `(collection, id)` with the embedding stored as little-endian `f32` bytes
//! and the metadata as a tagged JSON record. SQLite file locking lets
//! independent processes append concurrently; every call opens its own
//! connection and drops it before returning.
//!
//! Search is a linear cosine scan over one collection. The reported
//! similarity is `1 - cosine_distance` and is not clamped.

use super::embedder::{cosine_distance, Embedder};
use super::ordinal::OrdinalId;
use crate::error::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const INDEX_FILE: &str = "index.sqlite3";

/// Metadata attached to an indexed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentMeta {
    /// Free-text note
    Note { stored_at: OrdinalId },
    /// Session summary
    Session {
        project: Option<String>,
        created_at: OrdinalId,
    },
}

/// One ranked search result
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: OrdinalId,
    pub content: String,
    /// `1 - cosine distance`; may fall outside `[0, 1]`
    pub similarity: f32,
    pub metadata: DocumentMeta,
}

/// Result of a search, distinguishing an empty collection from no matches
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// The collection holds no documents
    EmptyIndex,
    /// Ranked hits, most similar first (may be empty)
    Hits(Vec<SearchHit>),
}

struct IndexInner {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    busy_timeout: Duration,
}

/// Handle to an on-disk semantic index
#[derive(Clone)]
pub struct SemanticIndex {
    inner: Arc<IndexInner>,
}

impl SemanticIndex {
    /// Open (creating if needed) the index stored under `dir`
    pub fn open(dir: &Path, embedder: Arc<dyn Embedder>, busy_timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let index = Self {
            inner: Arc::new(IndexInner {
                path: dir.join(INDEX_FILE),
                embedder,
                busy_timeout,
            }),
        };
        drop(index.connect()?);
        tracing::debug!(
            path = %index.inner.path.display(),
            embedder = index.inner.embedder.name(),
            dimension = index.inner.embedder.dimension(),
            "Opened semantic index"
        );
        Ok(index)
    }

    /// Handle to a named collection
    pub fn collection(&self, name: &str) -> Collection {
        Collection {
            index: self.clone(),
            name: name.to_string(),
        }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.inner.path)?;
        conn.busy_timeout(self.inner.busy_timeout)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )?;
        Ok(conn)
    }
}

/// A named document collection inside a `SemanticIndex`
#[derive(Clone)]
pub struct Collection {
    index: SemanticIndex,
    name: String,
}

impl Collection {
    /// Store content under a freshly allocated id with `Note` metadata
    pub fn store(&self, content: &str) -> Result<OrdinalId> {
        let id = OrdinalId::generate();
        let metadata = DocumentMeta::Note {
            stored_at: id.clone(),
        };
        self.add(&id, content, &metadata)?;
        Ok(id)
    }

    /// Store content under a caller-supplied id. Existing ids are never
    /// overwritten.
    pub fn add(&self, id: &OrdinalId, content: &str, metadata: &DocumentMeta) -> Result<()> {
        let embedding = self.index.inner.embedder.embed(content);
        let metadata = serde_json::to_string(metadata)?;

        let conn = self.index.connect()?;
        conn.execute(
            "INSERT INTO documents (collection, id, content, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.name, id.as_str(), content, encode(&embedding), metadata],
        )?;

        tracing::debug!(collection = %self.name, id = %id, "Indexed document");
        Ok(())
    }

    /// Number of documents in the collection
    pub fn count(&self) -> Result<usize> {
        let conn = self.index.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Rank documents by similarity to `query`, returning at most `k`
    pub fn search(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        let rows = {
            let conn = self.index.connect()?;
            let mut stmt = conn.prepare(
                "SELECT id, content, embedding, metadata FROM documents WHERE collection = ?1",
            )?;
            let rows = stmt
                .query_map(params![self.name], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        if rows.is_empty() {
            return Ok(SearchOutcome::EmptyIndex);
        }
        let k = k.min(rows.len());

        let query_embedding = self.index.inner.embedder.embed(query);
        let mut scored = Vec::with_capacity(rows.len());
        for (id, content, embedding, metadata) in rows {
            let distance = cosine_distance(&query_embedding, &decode(&embedding));
            let metadata: DocumentMeta = match serde_json::from_str(&metadata) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(
                        collection = %self.name,
                        id = %id,
                        error = %e,
                        "Skipping document with unreadable metadata"
                    );
                    continue;
                }
            };
            scored.push((distance, id, content, metadata));
        }

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(distance, id, content, metadata)| SearchHit {
                id: OrdinalId::from_stored(id),
                content,
                similarity: 1.0 - distance,
                metadata,
            })
            .collect();
        Ok(SearchOutcome::Hits(hits))
    }
}

fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embedder::HashingEmbedder;

    fn open_index(dir: &Path) -> SemanticIndex {
        SemanticIndex::open(
            dir,
            Arc::new(HashingEmbedder::default()),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    fn hits(outcome: SearchOutcome) -> Vec<SearchHit> {
        match outcome {
            SearchOutcome::Hits(hits) => hits,
            SearchOutcome::EmptyIndex => panic!("expected hits"),
        }
    }

    #[test]
    fn test_empty_collection_signal() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        assert_eq!(notes.count().unwrap(), 0);
        assert!(matches!(
            notes.search("anything", 5).unwrap(),
            SearchOutcome::EmptyIndex
        ));
    }

    #[test]
    fn test_store_sets_note_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        let id = notes.store("Remember to deploy on Friday").unwrap();

        let found = hits(notes.search("deploy", 5).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].metadata, DocumentMeta::Note { stored_at: id });
        assert!(found[0].similarity > 0.0);
    }

    #[test]
    fn test_k_is_clamped_and_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        notes.store("the database migration failed on staging").unwrap();
        notes.store("lunch order for friday").unwrap();

        let found = hits(notes.search("database migration", 50).unwrap());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].content, "the database migration failed on staging");
        assert!(found[0].similarity > found[1].similarity);
    }

    #[test]
    fn test_exact_content_ranks_above_unrelated() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        let texts = [
            "use tokio for the async runtime",
            "the CI pipeline runs on every push",
            "prefer rusqlite for local storage",
        ];
        for text in texts {
            notes.store(text).unwrap();
        }
        for text in texts {
            let found = hits(notes.search(text, 3).unwrap());
            assert_eq!(found[0].content, text);
            assert!(found[0].similarity > found[1].similarity);
            assert!(found[0].similarity > found[2].similarity);
        }
    }

    #[test]
    fn test_zero_k_yields_no_hits() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        notes.store("something").unwrap();
        assert!(hits(notes.search("something", 0).unwrap()).is_empty());
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(dir.path());
        index.collection("memories").store("a note").unwrap();

        let sessions = index.collection("sessions");
        assert_eq!(sessions.count().unwrap(), 0);
        assert!(matches!(
            sessions.search("a note", 5).unwrap(),
            SearchOutcome::EmptyIndex
        ));
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = open_index(dir.path()).collection("sessions");
        let id = OrdinalId::generate();
        let meta = DocumentMeta::Session {
            project: Some("demo".to_string()),
            created_at: id.clone(),
        };
        sessions.add(&id, "first", &meta).unwrap();
        assert!(sessions.add(&id, "second", &meta).is_err());

        let found = hits(sessions.search("first", 5).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "first");
    }

    #[test]
    fn test_empty_text_is_stored_without_harm() {
        let dir = tempfile::tempdir().unwrap();
        let notes = open_index(dir.path()).collection("memories");
        notes.store("").unwrap();
        notes.store("real content").unwrap();
        assert_eq!(notes.count().unwrap(), 2);

        let found = hits(notes.search("real content", 5).unwrap());
        assert_eq!(found[0].content, "real content");
        assert_eq!(found[1].content, "");
        assert!(found[1].similarity.abs() < 1e-6);
    }

    #[test]
    fn test_reopen_sees_existing_documents() {
        let dir = tempfile::tempdir().unwrap();
        open_index(dir.path())
            .collection("memories")
            .store("persisted note")
            .unwrap();
        let reopened = open_index(dir.path()).collection("memories");
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_unreadable_metadata_row_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(dir.path());
        let notes = index.collection("memories");
        notes.store("deploy checklist for friday").unwrap();

        let embedding = HashingEmbedder::default().embed("deploy checklist");
        index
            .connect()
            .unwrap()
            .execute(
                "INSERT INTO documents (collection, id, content, embedding, metadata)
                 VALUES ('memories', 'broken', 'deploy checklist', ?1, '{not json')",
                params![encode(&embedding)],
            )
            .unwrap();

        let found = hits(notes.search("deploy checklist", 5).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "deploy checklist for friday");
    }

    #[test]
    fn test_blob_round_trip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(decode(&encode(&v)), v);
    }
}
