//! Key/value facts over the structured store

use super::ordinal::next_instant;
use super::structured::StructuredStore;
use crate::error::Result;
use chrono::SecondsFormat;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

/// A structured fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub key: String,
    pub value: String,
    /// RFC 3339 UTC timestamp of the last `set`
    pub updated_at: String,
}

/// Upsert/read/list over the `facts` table
#[derive(Debug, Clone)]
pub struct FactStore {
    store: StructuredStore,
}

impl FactStore {
    pub fn new(store: StructuredStore) -> Self {
        Self { store }
    }

    /// Insert or overwrite a fact, stamping it with the current time
    pub fn set(&self, key: &str, value: &str) -> Result<Fact> {
        let updated_at = next_instant().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.store.with_connection(|conn| {
            conn.execute(
                "INSERT INTO facts (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, updated_at],
            )?;
            Ok(())
        })?;

        tracing::debug!(key, "Fact stored");
        Ok(Fact {
            key: key.to_string(),
            value: value.to_string(),
            updated_at,
        })
    }

    /// Read a fact; `None` when the key is unknown
    pub fn get(&self, key: &str) -> Result<Option<Fact>> {
        self.store.with_connection(|conn| {
            let fact = conn
                .query_row(
                    "SELECT key, value, updated_at FROM facts WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(Fact {
                            key: row.get(0)?,
                            value: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                            updated_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        })
                    },
                )
                .optional()?;
            Ok(fact)
        })
    }

    /// All facts, ascending by key
    pub fn list(&self) -> Result<Vec<Fact>> {
        self.store.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key, value, updated_at FROM facts ORDER BY key")?;
            let facts = stmt
                .query_map([], |row| {
                    Ok(Fact {
                        key: row.get(0)?,
                        value: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        updated_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(facts)
        })
    }
}
