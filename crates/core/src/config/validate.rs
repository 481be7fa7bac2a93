use super::{types::Config, ConfigError, SummarizerProvider};
use crate::source::SourceType;

/// Validate configuration
/// Currently validates:
/// - at least one enabled source
/// - YouTube API key present when a video/channel source is enabled
/// - summarizer credentials match the selected provider
/// - destination credentials are non-empty when a destination is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let enabled: Vec<_> = config.sources.iter().filter(|s| s.enabled).collect();
    if enabled.is_empty() {
        return Err(ConfigError::ValidationError(
            "no enabled sources configured".to_string(),
        ));
    }

    let needs_youtube = enabled
        .iter()
        .any(|s| matches!(s.source_type, SourceType::Video | SourceType::Channel));
    if needs_youtube && config.youtube.api_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "youtube.api_key is required when a video or channel source is enabled".to_string(),
        ));
    }

    for source in &config.sources {
        if source.identifier.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "source '{}' has an empty identifier",
                source.name
            )));
        }
    }

    if config.summarizer.model.is_empty() {
        return Err(ConfigError::ValidationError(
            "summarizer.model cannot be empty".to_string(),
        ));
    }
    if config.summarizer.provider == SummarizerProvider::Anthropic
        && config.summarizer.api_key.is_empty()
    {
        return Err(ConfigError::ValidationError(
            "summarizer.api_key is required for the anthropic provider".to_string(),
        ));
    }

    if config.output.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.dir cannot be empty".to_string(),
        ));
    }

    if let Some(line) = &config.line {
        if line.channel_token.is_empty() {
            return Err(ConfigError::ValidationError(
                "line.channel_token cannot be empty".to_string(),
            ));
        }
    }
    if let Some(notion) = &config.notion {
        if notion.token.is_empty() || notion.database_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "notion.token and notion.database_id are both required".to_string(),
            ));
        }
    }

    if let Some(window) = &config.window {
        if !(1..=12).contains(&window.month) {
            return Err(ConfigError::ValidationError(format!(
                "window.month must be 1-12, got {}",
                window.month
            )));
        }
    }

    Ok(())
}
