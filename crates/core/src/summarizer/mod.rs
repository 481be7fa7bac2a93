//! Summary generation over extracted content.
//!
//! A [`Summarizer`] turns one item's full text into a short digest. Two
//! providers are built in: the Anthropic messages API and a local Ollama
//! server. Both retry transient failures (transport errors, 429, 5xx) with
//! exponential backoff and fail fast on everything else.

mod llm;

pub use llm::{AnthropicSummarizer, OllamaSummarizer};

use async_trait::async_trait;
use std::time::Duration;

/// Upper bound on the body text sent to the model. Longer transcripts are
/// truncated; the opening of a talk carries the thesis.
const MAX_BODY_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You are a precise editorial assistant. Summarize the \
provided transcript or article in the same language it is written in. Produce \
3-6 short paragraphs covering the main claims and any concrete numbers or \
recommendations. Do not add opinions or content that is not in the text.";

/// Error type for summary generation.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Model returned an empty summary")]
    Empty,

    #[error("Summarizer not configured")]
    NotConfigured,
}

impl SummarizeError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizeError::Http(_) | SummarizeError::Timeout(_) => true,
            SummarizeError::Api { status, .. } => *status == 429 || *status >= 500,
            SummarizeError::Json(_) | SummarizeError::Empty | SummarizeError::NotConfigured => {
                false
            }
        }
    }
}

/// Trait for summary providers.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider name (e.g. "anthropic", "ollama").
    fn provider(&self) -> &str;

    /// Model name (e.g. "claude-3-haiku-20240307", "llama3").
    fn model(&self) -> &str;

    /// Summarize one item's full text.
    async fn summarize(&self, title: &str, body: &str) -> Result<String, SummarizeError>;
}

/// Build the user prompt for one item, truncating oversized bodies.
fn build_prompt(title: &str, body: &str) -> String {
    format!(
        "Title: {}\n\nFull text:\n{}",
        title,
        truncate_chars(body, MAX_BODY_CHARS)
    )
}

/// Truncate on a character boundary; byte slicing would panic mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SummarizeError::Http("reset".to_string()).is_retryable());
        assert!(SummarizeError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(SummarizeError::Api {
            status: 429,
            message: "rate limited".to_string()
        }
        .is_retryable());
        assert!(SummarizeError::Api {
            status: 503,
            message: "overloaded".to_string()
        }
        .is_retryable());

        assert!(!SummarizeError::Api {
            status: 401,
            message: "bad key".to_string()
        }
        .is_retryable());
        assert!(!SummarizeError::Empty.is_retryable());
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("短い", 10), "短い");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_prompt_contains_title_and_body() {
        let prompt = build_prompt("My talk", "transcript text");
        assert!(prompt.contains("My talk"));
        assert!(prompt.contains("transcript text"));
    }
}
