//! Session summaries, written to both the `sessions` table and the
//! `sessions` index collection under one id
//!
//! The table copy serves chronological listing, the index copy serves
//! similarity search. The two writes are not atomic: both are always
//! attempted, and when only one lands the gap is logged at error level and
//! reported as `Error::PartialWrite`. Nothing is rolled back.

use super::index::{Collection, DocumentMeta, SearchOutcome, SemanticIndex};
use super::ordinal::OrdinalId;
use super::structured::StructuredStore;
use crate::error::{Error, Result};
use rusqlite::params;
use serde::Serialize;

/// Index collection holding session summaries
pub const SESSIONS_COLLECTION: &str = "sessions";

const TABLE: &str = "sessions table";
const INDEX: &str = "semantic index";

/// A persisted session summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: OrdinalId,
    pub summary: String,
    pub project: Option<String>,
    pub created_at: OrdinalId,
}

/// Destination for distilled session summaries
pub trait SessionSink: Send + Sync {
    /// Persist a summary; an empty `project` means "no project"
    fn save(&self, summary: &str, project: &str) -> Result<SessionRecord>;
}

/// Dual-store session summaries
#[derive(Clone)]
pub struct SessionStore {
    table: StructuredStore,
    collection: Collection,
}

impl SessionStore {
    pub fn new(table: StructuredStore, index: &SemanticIndex) -> Self {
        Self {
            table,
            collection: index.collection(SESSIONS_COLLECTION),
        }
    }

    /// Save a summary under a fresh id in both stores
    pub fn save(&self, summary: &str, project: &str) -> Result<SessionRecord> {
        let id = OrdinalId::generate();
        let project = Some(project.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let record = SessionRecord {
            id: id.clone(),
            summary: summary.to_string(),
            project: project.clone(),
            created_at: id.clone(),
        };

        let table_write = self.insert_row(&record);
        let index_write = self.collection.add(
            &id,
            summary,
            &DocumentMeta::Session {
                project,
                created_at: id.clone(),
            },
        );

        match (table_write, index_write) {
            (Ok(()), Ok(())) => {
                tracing::info!(id = %id, project = ?record.project, "Session saved");
                Ok(record)
            }
            (Ok(()), Err(e)) => Err(partial(&id, TABLE, INDEX, e)),
            (Err(e), Ok(())) => Err(partial(&id, INDEX, TABLE, e)),
            (Err(table_err), Err(index_err)) => {
                tracing::error!(
                    id = %id,
                    table_error = %table_err,
                    index_error = %index_err,
                    "Session not saved to either store"
                );
                Err(table_err)
            }
        }
    }

    /// Most recent sessions first, at most `n`
    pub fn list(&self, n: usize) -> Result<Vec<SessionRecord>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.table.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, summary, project, created_at FROM sessions
                 ORDER BY created_at DESC LIMIT ?1",
            )?;
            let records = stmt
                .query_map(params![limit], |row| {
                    Ok(SessionRecord {
                        id: OrdinalId::from_stored(row.get::<_, String>(0)?),
                        summary: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        project: row
                            .get::<_, Option<String>>(2)?
                            .filter(|p| !p.is_empty()),
                        created_at: OrdinalId::from_stored(
                            row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        ),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    /// Most similar sessions first, at most `n_results`
    pub fn search(&self, query: &str, n_results: usize) -> Result<SearchOutcome> {
        self.collection.search(query, n_results)
    }

    fn insert_row(&self, record: &SessionRecord) -> Result<()> {
        self.table.with_connection(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, summary, project, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.as_str(),
                    record.summary,
                    record.project,
                    record.created_at.as_str()
                ],
            )?;
            Ok(())
        })
    }
}

impl SessionSink for SessionStore {
    fn save(&self, summary: &str, project: &str) -> Result<SessionRecord> {
        SessionStore::save(self, summary, project)
    }
}

fn partial(id: &OrdinalId, written: &'static str, missing: &'static str, cause: Error) -> Error {
    tracing::error!(
        id = %id,
        written,
        missing,
        error = %cause,
        "Session recorded in only one store"
    );
    Error::PartialWrite {
        id: id.to_string(),
        written,
        missing,
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embedder::HashingEmbedder;
    use std::sync::Arc;
    use std::time::Duration;

    fn open_index(dir: &std::path::Path) -> SemanticIndex {
        SemanticIndex::open(
            &dir.join("chroma"),
            Arc::new(HashingEmbedder::default()),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    fn session_store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(
            StructuredStore::new(dir.path().join("facts.db"), Duration::from_millis(500)),
            &open_index(dir.path()),
        )
    }

    #[test]
    fn test_save_writes_both_copies() {
        let dir = tempfile::tempdir().unwrap();
        let store = session_store(&dir);
        let record = store.save("Did X", "demo").unwrap();
        assert_eq!(record.id, record.created_at);
        assert_eq!(record.project.as_deref(), Some("demo"));

        let listed = store.list(1).unwrap();
        assert_eq!(listed, vec![record.clone()]);

        let SearchOutcome::Hits(hits) = store.search("Did X", 5).unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, record.id);
        assert_eq!(
            hits[0].metadata,
            DocumentMeta::Session {
                project: Some("demo".to_string()),
                created_at: record.id.clone(),
            }
        );
    }

    #[test]
    fn test_list_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = session_store(&dir);
        let ids: Vec<OrdinalId> = (0..5)
            .map(|i| store.save(&format!("session {i}"), "").unwrap().id)
            .collect();

        let listed = store.list(5).unwrap();
        let listed_ids: Vec<OrdinalId> = listed.iter().map(|r| r.id.clone()).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(listed_ids, expected);
        assert!(listed.iter().all(|r| r.project.is_none()));

        assert_eq!(store.list(2).unwrap().len(), 2);
        assert_eq!(store.list(0).unwrap().len(), 0);
        assert_eq!(store.list(100).unwrap().len(), 5);
    }

    #[test]
    fn test_blank_project_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let record = session_store(&dir).save("summary", "   ").unwrap();
        assert!(record.project.is_none());
    }

    /// Overwrite the index file with bytes SQLite refuses to open
    fn corrupt_index(dir: &tempfile::TempDir) {
        std::fs::write(dir.path().join("chroma").join("index.sqlite3"), vec![b'x'; 4096]).unwrap();
    }

    #[test]
    fn test_index_failure_is_partial_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = session_store(&dir);
        corrupt_index(&dir);

        let err = store.save("table only", "demo").unwrap_err();
        match err {
            Error::PartialWrite {
                id, written, missing, ..
            } => {
                assert_eq!(written, TABLE);
                assert_eq!(missing, INDEX);
                let listed = store.list(10).unwrap();
                assert_eq!(listed.len(), 1);
                assert_eq!(listed[0].id.as_str(), id);
                assert_eq!(listed[0].summary, "table only");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_both_failures_return_table_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad_db = dir.path().join("not-a-file");
        std::fs::create_dir_all(&bad_db).unwrap();
        let index = open_index(dir.path());
        let store = SessionStore::new(
            StructuredStore::new(bad_db, Duration::from_millis(100)),
            &index,
        );
        corrupt_index(&dir);

        let err = store.save("lost summary", "demo").unwrap_err();
        assert!(matches!(err, Error::Database(_)), "unexpected error: {err}");
        assert!(err.to_string().contains("unable to open"), "got: {err}");
    }

    #[test]
    fn test_table_failure_is_partial_write() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be makes every table write fail.
        let bad_db = dir.path().join("not-a-file");
        std::fs::create_dir_all(&bad_db).unwrap();
        let index = open_index(dir.path());
        let store = SessionStore::new(
            StructuredStore::new(bad_db, Duration::from_millis(100)),
            &index,
        );

        let err = store.save("orphan summary", "demo").unwrap_err();
        match err {
            Error::PartialWrite { written, missing, .. } => {
                assert_eq!(written, INDEX);
                assert_eq!(missing, TABLE);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The index copy exists under the same id the error names.
        assert_eq!(index.collection(SESSIONS_COLLECTION).count().unwrap(), 1);
    }

    #[test]
    fn test_sink_trait_delegates() {
        let dir = tempfile::tempdir().unwrap();
        let store = session_store(&dir);
        let sink: &dyn SessionSink = &store;
        let record = sink.save("via sink", "proj").unwrap();
        assert_eq!(store.list(10).unwrap(), vec![record]);
    }
}
