//! Session-end distillation pipeline
//!
//! ```text
//! ReadInput → ValidateInput → CheckMemoryEnabled → ReadTranscript
//!   → ParseMessages → Truncate → Summarize → Persist → Done
//! ```
//!
//! Every stage can end the run early. A project without a memory root ends
//! it silently (`NotApplicable`); every other early exit is a
//! `DistillError`. Nothing is persisted unless the summary is non-empty, and
//! the session sink is not even opened before that point.

use super::summarizer::{SummarizeError, Summarizer};
use super::transcript::{parse_messages, render_transcript, truncate_tail};
use crate::config::MemoryConfig;
use crate::memory::{ProjectMemory, SessionRecord, SessionSink};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Trigger payload delivered on session end
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadInput,
    ValidateInput,
    CheckMemoryEnabled,
    ReadTranscript,
    ParseMessages,
    Truncate,
    Summarize,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ReadInput => "read_input",
            Stage::ValidateInput => "validate_input",
            Stage::CheckMemoryEnabled => "check_memory_enabled",
            Stage::ReadTranscript => "read_transcript",
            Stage::ParseMessages => "parse_messages",
            Stage::Truncate => "truncate",
            Stage::Summarize => "summarize",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Reason a distillation run stopped without persisting
#[derive(Error, Debug)]
pub enum DistillError {
    /// Trigger payload is not a JSON object of the expected shape
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    /// Required trigger field missing or empty
    #[error("hook input is missing {0}")]
    MissingField(&'static str),

    /// Transcript file does not exist
    #[error("transcript not found: {}", .0.display())]
    TranscriptNotFound(PathBuf),

    /// Transcript file exists but could not be read
    #[error("transcript unreadable: {}: {source}", .path.display())]
    TranscriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No user or assistant text in the transcript
    #[error("no messages in transcript")]
    NoMessages,

    /// Summarization service credential missing
    #[error("summarizer not configured: no API key in ${0}")]
    MissingCredential(String),

    /// Summarization call failed
    #[error("external service error: {0}")]
    Service(String),

    /// Summarization returned no text
    #[error("empty summary")]
    EmptySummary,

    /// Session store write failed
    #[error("failed to persist summary: {0}")]
    Persist(#[source] crate::error::Error),
}

impl DistillError {
    /// Stage at which the run stopped
    pub fn stage(&self) -> Stage {
        match self {
            DistillError::InvalidInput(_) => Stage::ReadInput,
            DistillError::MissingField(_) => Stage::ValidateInput,
            DistillError::TranscriptNotFound(_) | DistillError::TranscriptUnreadable { .. } => {
                Stage::ReadTranscript
            }
            DistillError::NoMessages => Stage::ParseMessages,
            DistillError::MissingCredential(_)
            | DistillError::Service(_)
            | DistillError::EmptySummary => Stage::Summarize,
            DistillError::Persist(_) => Stage::Persist,
        }
    }
}

impl From<SummarizeError> for DistillError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::MissingCredential(env) => DistillError::MissingCredential(env),
            SummarizeError::Service(message) => DistillError::Service(message),
        }
    }
}

/// Terminal state of a run
#[derive(Debug)]
pub enum DistillOutcome {
    /// Summary persisted
    Saved(SessionRecord),
    /// Project has no memory root; nothing to do
    NotApplicable,
    /// Run stopped early
    Failed(DistillError),
}

/// Opens the session sink for a memory root
pub type SinkFactory =
    Box<dyn Fn(&Path) -> crate::error::Result<Arc<dyn SessionSink>> + Send + Sync>;

/// Transcript-to-summary pipeline
pub struct Distiller {
    config: MemoryConfig,
    summarizer: Arc<dyn Summarizer>,
    open_sink: SinkFactory,
}

impl Distiller {
    pub fn new(config: MemoryConfig, summarizer: Arc<dyn Summarizer>, open_sink: SinkFactory) -> Self {
        Self {
            config,
            summarizer,
            open_sink,
        }
    }

    /// Distiller persisting into the project's own memory stores
    pub fn with_project_memory(config: MemoryConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        let store_config = config.clone();
        let open_sink: SinkFactory = Box::new(move |root: &Path| {
            let memory = ProjectMemory::open(root, &store_config)?;
            Ok(Arc::new(memory.sessions) as Arc<dyn SessionSink>)
        });
        Self::new(config, summarizer, open_sink)
    }

    /// Run the pipeline on a raw trigger payload
    pub async fn run(&self, raw_input: &str) -> DistillOutcome {
        match self.try_run(raw_input).await {
            Ok(Some(record)) => DistillOutcome::Saved(record),
            Ok(None) => DistillOutcome::NotApplicable,
            Err(err) => DistillOutcome::Failed(err),
        }
    }

    /// Run on a separate task and log how the run ended.
    ///
    /// Never fails: a panic inside the pipeline is logged and reported as
    /// `None`.
    pub async fn run_logged(self, raw_input: String) -> Option<DistillOutcome> {
        let outcome = match tokio::spawn(async move { self.run(&raw_input).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Session distillation aborted");
                return None;
            }
        };
        match &outcome {
            DistillOutcome::Saved(record) => {
                tracing::info!(id = %record.id, project = ?record.project, "Session summary saved");
            }
            DistillOutcome::NotApplicable => {}
            DistillOutcome::Failed(err) => {
                tracing::warn!(stage = %err.stage(), error = %err, "Session distillation failed");
            }
        }
        Some(outcome)
    }

    async fn try_run(&self, raw_input: &str) -> Result<Option<SessionRecord>, DistillError> {
        let input: HookInput = serde_json::from_str(raw_input)
            .map_err(|e| DistillError::InvalidInput(e.to_string()))?;

        let transcript_path = non_empty(input.transcript_path.as_deref())
            .ok_or(DistillError::MissingField("transcript_path"))?;
        let cwd = non_empty(input.cwd.as_deref()).ok_or(DistillError::MissingField("cwd"))?;
        tracing::debug!(session_id = ?input.session_id, cwd, "Session end received");

        let memory_root = self.config.storage.memory_root(Path::new(cwd));
        if !memory_root.is_dir() {
            tracing::debug!(root = %memory_root.display(), "Memory not enabled for project");
            return Ok(None);
        }

        let transcript_path = PathBuf::from(transcript_path);
        if !transcript_path.is_file() {
            return Err(DistillError::TranscriptNotFound(transcript_path));
        }
        let raw = tokio::fs::read(&transcript_path)
            .await
            .map_err(|source| DistillError::TranscriptUnreadable {
                path: transcript_path.clone(),
                source,
            })?;
        let raw = String::from_utf8_lossy(&raw);

        let messages = parse_messages(&raw);
        if messages.is_empty() {
            return Err(DistillError::NoMessages);
        }

        let full = render_transcript(&messages);
        let transcript = truncate_tail(&full, self.config.summarizer.max_transcript_chars);
        tracing::debug!(
            messages = messages.len(),
            chars = transcript.chars().count(),
            "Transcript prepared"
        );

        let summary = self.summarizer.summarize(transcript).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(DistillError::EmptySummary);
        }

        let project = project_name(cwd);
        let sink = (self.open_sink)(&memory_root).map_err(DistillError::Persist)?;
        let record = sink.save(summary, &project).map_err(DistillError::Persist)?;
        Ok(Some(record))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Last path segment of the working directory
pub fn project_name(cwd: &str) -> String {
    Path::new(cwd.trim_end_matches('/'))
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
