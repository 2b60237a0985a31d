//! Project Memory - persistent per-project memory for coding assistant sessions
//!
//! Each project opts in by having a memory directory (`.claude/memory` by
//! default). Inside it live two stores:
//!
//! ```text
//! <project>/.claude/memory/
//! ├── chroma/index.sqlite3   semantic index (notes, session summaries)
//! └── facts.db               structured store (facts, sessions table)
//! ```
//!
//! ## Modules
//!
//! - [`memory`]: the stores (facts, notes, sessions) and the semantic index
//! - [`tools`]: text-rendering tool surface over the stores
//! - [`server`]: line-delimited JSON-RPC server exposing the tools on stdio
//! - [`distill`]: session-end transcript summarization
//! - [`config`]: configuration management

pub mod config;
pub mod distill;
pub mod error;
pub mod memory;
pub mod server;
pub mod tools;

pub use config::MemoryConfig;
pub use error::{Error, Result};
