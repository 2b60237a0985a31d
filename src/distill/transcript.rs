//! Transcript parsing and tail truncation
//!
//! A transcript is JSON Lines. Only records whose `type` is `user` or
//! `assistant` contribute text; everything else (tool results, system
//! records, unparsable lines) is skipped.

use serde::Deserialize;
use std::fmt;

/// Separator between rendered messages, and the prefix of a message boundary
const MESSAGE_SEPARATOR: &str = "\n\n";
const MESSAGE_BOUNDARY: &str = "\n\n[";

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn from_record_type(kind: &str) -> Option<Self> {
        match kind {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// Message content: a plain string or a list of typed blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    PlainText(String),
    Blocks(Vec<ContentBlock>),
}

/// One element of a block list. Anything that is not a `{type, text}`
/// object is kept as `Other` and contributes no text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Typed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        text: Option<String>,
    },
    Other(serde_json::Value),
}

impl MessageContent {
    /// Extracted text, or `None` when nothing non-blank remains.
    ///
    /// Plain text is trimmed; for block lists the trimmed, non-empty text of
    /// every `text` block is joined with single spaces.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            MessageContent::PlainText(s) => s.trim().to_string(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Typed { kind, text: Some(text) } if kind == "text" => {
                        Some(text.trim())
                    }
                    _ => None,
                })
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: Option<RecordMessage>,
}

#[derive(Debug, Deserialize)]
struct RecordMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

/// A user or assistant message with its extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub role: Role,
    pub text: String,
}

impl fmt::Display for TranscriptMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.role.label(), self.text)
    }
}

/// Parse JSON Lines into the ordered user/assistant messages
pub fn parse_messages(raw: &str) -> Vec<TranscriptMessage> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<TranscriptRecord>(line).ok())
        .filter_map(|record| {
            let role = Role::from_record_type(&record.kind)?;
            let text = record.message?.content?.text()?;
            Some(TranscriptMessage { role, text })
        })
        .collect()
}

/// Join rendered messages with blank lines
pub fn render_transcript(messages: &[TranscriptMessage]) -> String {
    messages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

/// Keep at most `budget` trailing characters, starting at a message boundary.
///
/// Text within budget is returned unchanged. Otherwise the tail is cut at
/// `budget` characters and advanced past the first `"\n\n["` so it begins
/// with a `[Role]: ` tag; without such a boundary the raw tail is kept.
pub fn truncate_tail(text: &str, budget: usize) -> &str {
    let total = text.chars().count();
    if total <= budget {
        return text;
    }

    let start = text
        .char_indices()
        .nth(total - budget)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let tail = &text[start..];

    match tail.find(MESSAGE_BOUNDARY) {
        Some(pos) => &tail[pos + MESSAGE_SEPARATOR.len()..],
        None => tail,
    }
}
