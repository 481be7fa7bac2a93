use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::source::SourceDescriptor;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Sources to poll each run.
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub line: Option<LineConfig>,
    #[serde(default)]
    pub notion: Option<NotionConfig>,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Optional publication window; only items published in this month are
    /// considered.
    #[serde(default)]
    pub window: Option<WindowConfig>,
}

/// YouTube Data API configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct YouTubeConfig {
    /// API key; required when any video or channel source is enabled.
    #[serde(default)]
    pub api_key: String,
    /// Preferred caption languages, tried in order.
    #[serde(default)]
    pub caption_languages: Vec<String>,
}

/// Summary provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: SummarizerProvider,
    /// API key (anthropic only).
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Override the provider endpoint (useful for tests and proxies).
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_summarizer_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::default(),
            api_key: String::new(),
            model: default_model(),
            api_base: None,
            timeout_secs: default_summarizer_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerProvider {
    #[default]
    Anthropic,
    Ollama,
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_summarizer_timeout() -> u32 {
    60
}

fn default_max_retries() -> u32 {
    2
}

/// Speech-to-text fallback configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Language hint for the model; omit for auto-detect.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_yt_dlp_bin")]
    pub yt_dlp_bin: String,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u32,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            language: None,
            yt_dlp_bin: default_yt_dlp_bin(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/ggml-base.bin")
}

fn default_yt_dlp_bin() -> String {
    "yt-dlp".to_string()
}

fn default_download_timeout() -> u32 {
    600
}

/// Dedup ledger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Directory for the file backend, database file for sqlite.
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            path: default_ledger_path(),
        }
    }
}

/// Available ledger backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    #[default]
    File,
    Sqlite,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("ledger")
}

/// Markdown output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("summaries")
}

/// LINE broadcast destination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineConfig {
    pub channel_token: String,
}

/// Notion database destination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
}

/// Pipeline pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    /// Pause between items, to stay polite to upstream APIs.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

fn default_item_delay_ms() -> u64 {
    2000
}

/// Month window for discovery
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct WindowConfig {
    pub year: i32,
    pub month: u32,
}

/// Sanitized config for logs (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub sources: usize,
    pub youtube_key_configured: bool,
    pub summarizer: SanitizedSummarizerConfig,
    pub ledger: LedgerConfig,
    pub output_dir: PathBuf,
    pub line_configured: bool,
    pub notion_configured: bool,
}

/// Sanitized summarizer config (API key redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSummarizerConfig {
    pub provider: SummarizerProvider,
    pub model: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            sources: config.sources.len(),
            youtube_key_configured: !config.youtube.api_key.is_empty(),
            summarizer: SanitizedSummarizerConfig {
                provider: config.summarizer.provider,
                model: config.summarizer.model.clone(),
                api_key_configured: !config.summarizer.api_key.is_empty(),
            },
            ledger: config.ledger.clone(),
            output_dir: config.output.dir.clone(),
            line_configured: config.line.is_some(),
            notion_configured: config.notion.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.ledger.backend, LedgerBackend::File);
        assert_eq!(config.output.dir, PathBuf::from("summaries"));
        assert_eq!(config.pipeline.item_delay_ms, 2000);
        assert!(config.window.is_none());
    }

    #[test]
    fn test_sanitized_redacts_secrets() {
        let mut config: Config = toml::from_str("").unwrap();
        config.summarizer.api_key = "sk-secret".to_string();
        config.youtube.api_key = "yt-secret".to_string();

        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
        assert!(sanitized.summarizer.api_key_configured);
        assert!(sanitized.youtube_key_configured);
    }
}
