//! Project Memory error types

use thiserror::Error;

/// Project Memory error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structured store (SQLite) error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A session was recorded in only one of its two stores
    #[error("Session {id} saved to {written} but not to {missing}: {cause}")]
    PartialWrite {
        id: String,
        written: &'static str,
        missing: &'static str,
        cause: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Project Memory operations
pub type Result<T> = std::result::Result<T, Error>;
