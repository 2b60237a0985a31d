//! Structured store: the SQLite file holding the `facts` and `sessions` tables
//!
//! No connection outlives an operation. `with_connection` opens the file,
//! creates any missing table, hands the connection to the caller for a
//! single statement and drops it, so the lock window seen by other processes
//! stays as short as possible.

use crate::error::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS facts (
    key TEXT PRIMARY KEY,
    value TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    summary TEXT,
    project TEXT,
    created_at TEXT
);
"#;

/// Connection-scoped handle to the structured store file
#[derive(Debug, Clone)]
pub struct StructuredStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl StructuredStore {
    /// Create a handle. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` on a fresh connection; the connection is closed afterwards.
    pub fn with_connection<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        op(&conn)
    }
}
