//! Project Memory configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Project Memory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// On-disk layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Semantic index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Summarization service configuration
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Tool surface defaults
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl MemoryConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from an explicit path, else the user config file if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default config file location (`<config_dir>/project-memory/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("project-memory").join("config.toml"))
    }
}

/// Storage layout, relative to a project directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Memory root inside the project; its presence opts a project in
    pub memory_dir: PathBuf,

    /// Semantic index subdirectory inside the memory root
    pub index_dir: String,

    /// Structured store file inside the memory root
    pub database_file: String,

    /// How long a connection waits on a lock held by another process
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_dir: PathBuf::from(".claude").join("memory"),
            index_dir: "chroma".to_string(),
            database_file: "facts.db".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    /// Memory root for a project directory
    pub fn memory_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.memory_dir)
    }

    /// Semantic index directory under a memory root
    pub fn index_path(&self, memory_root: &Path) -> PathBuf {
        memory_root.join(&self.index_dir)
    }

    /// Structured store file under a memory root
    pub fn database_path(&self, memory_root: &Path) -> PathBuf {
        memory_root.join(&self.database_file)
    }
}

/// Semantic index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Embedding dimension of the local hashing embedder
    pub dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

/// Summarization service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Custom base URL (defaults to the public Messages endpoint)
    pub base_url: Option<String>,

    /// Model used for session summaries
    pub model: String,

    /// Output token budget for one summary
    pub max_tokens: u32,

    /// Transcript character budget; the tail is kept
    pub max_transcript_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
            max_transcript_chars: 150_000,
        }
    }
}

impl SummarizerConfig {
    /// Resolve the API key from `api_key_env`. Empty values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Tool surface defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Default `n_results` for memory_search and session_search
    pub default_results: usize,

    /// Default `n` for session_list
    pub default_session_list: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_results: 5,
            default_session_list: 10,
        }
    }
}
