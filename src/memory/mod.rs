//! Memory system: dual-store project memory
//!
//! Facts live in the structured store, notes in the semantic index, and
//! session summaries in both.

pub mod embedder;
pub mod facts;
pub mod index;
pub mod notes;
pub mod ordinal;
pub mod project;
pub mod sessions;
pub mod structured;

pub use embedder::{Embedder, HashingEmbedder};
pub use facts::{Fact, FactStore};
pub use index::{Collection, DocumentMeta, SearchHit, SearchOutcome, SemanticIndex};
pub use notes::MemoryStore;
pub use ordinal::OrdinalId;
pub use project::ProjectMemory;
pub use sessions::{SessionRecord, SessionSink, SessionStore};
pub use structured::StructuredStore;
