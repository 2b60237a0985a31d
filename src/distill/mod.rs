//! Transcript distillation: turn a finished session's transcript into a
//! persisted session summary

pub mod pipeline;
pub mod summarizer;
pub mod transcript;

pub use pipeline::{DistillError, DistillOutcome, Distiller, HookInput, SinkFactory, Stage};
pub use summarizer::{AnthropicSummarizer, SummarizeError, Summarizer};
pub use transcript::{parse_messages, render_transcript, truncate_tail, MessageContent, Role};
