//! Summarizer implementations backed by hosted and local LLM APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{build_prompt, SummarizeError, Summarizer, SYSTEM_PROMPT};
use crate::metrics;

const DEFAULT_MAX_TOKENS: u32 = 1024;

async fn backoff(attempt: u32) {
    // 500ms, 1s, 2s, ...
    let delay = Duration::from_millis(500u64 << attempt.min(6));
    tokio::time::sleep(delay).await;
}

// ============================================================================
// Anthropic
// ============================================================================

/// Summarizer backed by the Anthropic messages API.
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
    max_retries: u32,
}

impl AnthropicSummarizer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn send_once(&self, prompt: &str) -> Result<String, SummarizeError> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout(self.timeout)
                } else {
                    SummarizeError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicErrorEnvelope>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(SummarizeError::Api { status, message });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Json(e.to_string()))?;

        debug!(
            "Anthropic usage: {} in / {} out",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        let text = parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, title: &str, body: &str) -> Result<String, SummarizeError> {
        if self.api_key.is_empty() {
            return Err(SummarizeError::NotConfigured);
        }
        let prompt = build_prompt(title, body);

        let mut attempt = 0;
        loop {
            match self.send_once(&prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        "Summarize attempt {} failed ({}), retrying",
                        attempt + 1,
                        e
                    );
                    metrics::SUMMARIZE_RETRIES.inc();
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

// ============================================================================
// Ollama
// ============================================================================

/// Summarizer backed by a local Ollama server. No API key required.
pub struct OllamaSummarizer {
    client: reqwest::Client,
    model: String,
    api_base: String,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaSummarizer {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            api_base: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 2,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn send_once(&self, prompt: &str) -> Result<String, SummarizeError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: Some(SYSTEM_PROMPT.to_string()),
            stream: false,
            options: OllamaOptions {
                num_predict: DEFAULT_MAX_TOKENS,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_base))
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout(self.timeout)
                } else {
                    SummarizeError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(SummarizeError::Api { status, message });
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Json(e.to_string()))?;

        if parsed.response.trim().is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(parsed.response)
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, title: &str, body: &str) -> Result<String, SummarizeError> {
        let prompt = build_prompt(title, body);

        let mut attempt = 0;
        loop {
            match self.send_once(&prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        "Summarize attempt {} failed ({}), retrying",
                        attempt + 1,
                        e
                    );
                    metrics::SUMMARIZE_RETRIES.inc();
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}
