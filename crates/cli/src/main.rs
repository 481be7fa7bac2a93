use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recap_core::{
    create_ledger,
    extractor::{
        ArticleExtractor, AudioTranscriber, ContentExtractor, SttConfig, WhisperTranscriber,
        YouTubeCaptionClient,
    },
    load_config,
    publisher::{LineBroadcaster, MarkdownPublisher, NotionPublisher, Publisher},
    source::{PublishedWindow, RssReader, SourceReader, YouTubeReader},
    summarizer::{AnthropicSummarizer, OllamaSummarizer},
    validate_config, PipelineRunner, RunSettings, SanitizedConfig, Summarizer, SummarizerProvider,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path: CLI argument, then environment, then default.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RECAP_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load configuration
    info!("recap {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "Configuration loaded (hash {}): {} sources, output {:?}",
        &config_hash[..16],
        sanitized.sources,
        sanitized.output_dir
    );

    // Optional month window for channel discovery
    let window = match &config.window {
        Some(w) => Some(
            PublishedWindow::for_month(w.year, w.month)
                .with_context(|| format!("Invalid window {}-{:02}", w.year, w.month))?,
        ),
        None => None,
    };

    // Source readers
    let mut readers: Vec<Arc<dyn SourceReader>> = Vec::new();
    if !config.youtube.api_key.is_empty() {
        let mut youtube = YouTubeReader::new(config.youtube.api_key.clone());
        if let Some(window) = window {
            youtube = youtube.with_window(window);
        }
        readers.push(Arc::new(youtube));
    }
    let mut rss = RssReader::new();
    if let Some(window) = window {
        rss = rss.with_window(window);
    }
    readers.push(Arc::new(rss));

    // Extraction chain
    let captions = YouTubeCaptionClient::new()
        .with_languages(config.youtube.caption_languages.clone());
    let transcriber = WhisperTranscriber::new(SttConfig {
        model_path: config.whisper.model_path.clone(),
        language: config.whisper.language.clone(),
        yt_dlp_bin: config.whisper.yt_dlp_bin.clone(),
        download_timeout: Duration::from_secs(config.whisper.download_timeout_secs as u64),
        ..SttConfig::default()
    });
    info!("Speech-to-text model: {}", transcriber.model_name());
    let extractor = ContentExtractor::new(
        Arc::new(captions),
        Arc::new(transcriber),
        Arc::new(ArticleExtractor::new()),
    );

    // Summarizer
    let summarizer: Arc<dyn Summarizer> = match config.summarizer.provider {
        SummarizerProvider::Anthropic => {
            let mut client =
                AnthropicSummarizer::new(config.summarizer.api_key.clone(), config.summarizer.model.clone())
                    .with_timeout(Duration::from_secs(config.summarizer.timeout_secs as u64))
                    .with_max_retries(config.summarizer.max_retries);
            if let Some(base) = &config.summarizer.api_base {
                client = client.with_api_base(base.clone());
            }
            Arc::new(client)
        }
        SummarizerProvider::Ollama => {
            let mut client = OllamaSummarizer::new(config.summarizer.model.clone())
                .with_timeout(Duration::from_secs(config.summarizer.timeout_secs as u64))
                .with_max_retries(config.summarizer.max_retries);
            if let Some(base) = &config.summarizer.api_base {
                client = client.with_api_base(base.clone());
            }
            Arc::new(client)
        }
    };
    info!(
        "Summarizer: {}/{}",
        summarizer.provider(),
        summarizer.model()
    );

    // Dedup ledger
    let ledger = create_ledger(&config.ledger).context("Failed to open ledger")?;
    info!(
        "Ledger ready ({:?}): {} processed, {} failed",
        config.ledger.path,
        ledger.processed_count().unwrap_or(0),
        ledger.failed_count().unwrap_or(0)
    );

    // Publishers
    let mut publishers: Vec<Arc<dyn Publisher>> = Vec::new();
    publishers.push(Arc::new(MarkdownPublisher::new(config.output.dir.clone())));
    if let Some(line) = &config.line {
        publishers.push(Arc::new(LineBroadcaster::new(line.channel_token.clone())));
    }
    if let Some(notion) = &config.notion {
        publishers.push(Arc::new(NotionPublisher::new(
            notion.token.clone(),
            notion.database_id.clone(),
        )));
    }
    info!(
        "Publishers: {}",
        publishers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Assemble the runner
    let mut runner = PipelineRunner::new(
        config.sources.clone(),
        ledger,
        extractor,
        summarizer,
    )
    .with_settings(RunSettings {
        item_delay: Duration::from_millis(config.pipeline.item_delay_ms),
    });
    for reader in readers {
        runner = runner.with_reader(reader);
    }
    for publisher in publishers {
        runner = runner.with_publisher(publisher);
    }

    // Ctrl-C winds the run down at the next item boundary.
    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current item then stopping");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let report = runner.run().await;
    println!("{}", report);

    Ok(())
}
