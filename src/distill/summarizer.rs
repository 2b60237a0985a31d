//! Session summarization service
//!
//! `Summarizer` is the seam to the external language model. The shipped
//! implementation calls the Anthropic Messages API once per transcript.
//! There is no retry and no request timeout: the distiller runs at most once
//! per session end and a failed call only means that session goes
//! unsummarized.

use crate::config::SummarizerConfig;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Default Messages API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Messages API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Instruction placed before the transcript
pub const SUMMARY_PROMPT: &str = "\
You are given the transcript of an AI coding assistant session. Write a structured \
session summary with exactly these sections:

**What was done**: A short bullet list of completed tasks and changes.
**Decisions**: Important technical or architectural decisions.
**Open items**: What is unfinished or should happen next.

Keep the summary compact (at most 300 words). No preamble, start directly with the sections.";

/// Summarization failure
#[derive(Error, Debug)]
pub enum SummarizeError {
    /// No credential available for the service
    #[error("no API key found in ${0}")]
    MissingCredential(String),

    /// The call failed or returned an unusable response
    #[error("{0}")]
    Service(String),
}

/// External summarization service
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize an already-truncated transcript. The returned text may be
    /// empty or padded; callers trim it.
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}

/// Full prompt sent to the model for a transcript
pub fn build_prompt(transcript: &str) -> String {
    format!("{SUMMARY_PROMPT}\n\n---\n\n{transcript}")
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API summarizer
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_key: Option<String>,
    api_key_env: String,
    base_url: Option<String>,
    model: String,
    max_tokens: u32,
}

impl AnthropicSummarizer {
    /// Build from configuration, resolving the API key from the environment
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(config, config.resolve_api_key())
    }

    /// Build with an explicit API key (or none)
    pub fn new(config: &SummarizerConfig, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
    }

    fn build_request_body(&self, transcript: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": build_prompt(transcript),
            }],
        })
    }
}

/// Concatenate the text blocks of a Messages API response
fn extract_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect()
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummarizeError::MissingCredential(self.api_key_env.clone()))?;

        tracing::debug!(
            model = %self.model,
            transcript_chars = transcript.chars().count(),
            "Requesting session summary"
        );

        let response = self
            .client
            .post(self.base_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request_body(transcript))
            .send()
            .await
            .map_err(|e| SummarizeError::Service(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Service(format!("HTTP {status}: {body}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Service(format!("invalid response: {e}")))?;
        Ok(extract_text(&parsed))
    }
}
