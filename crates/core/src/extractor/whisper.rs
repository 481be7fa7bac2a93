//! Local speech-to-text fallback.
//!
//! Audio is fetched with a `yt-dlp` subprocess (extract-audio to a 16 kHz
//! mono WAV in a temp directory), decoded with `hound`, and transcribed with
//! whisper.cpp via `whisper-rs`. The temp file is removed afterwards.
//!
//! Requires the `whisper` cargo feature (and cmake at build time). Without
//! it a stub is compiled that fails with [`TranscribeError::Disabled`], so a
//! captions-only deployment still links.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{AudioTranscriber, TranscribeError};
use crate::source::Item;

#[cfg(feature = "whisper")]
use std::process::Stdio;
#[cfg(feature = "whisper")]
use std::sync::Mutex;
#[cfg(feature = "whisper")]
use tokio::process::Command;
#[cfg(feature = "whisper")]
use tokio::time::timeout;
#[cfg(feature = "whisper")]
use tracing::{debug, info, warn};
#[cfg(feature = "whisper")]
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Configuration for the speech-to-text fallback.
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Path to a ggml whisper model (e.g. `models/ggml-base.bin`).
    pub model_path: PathBuf,
    /// Language hint; `None` lets the model auto-detect.
    pub language: Option<String>,
    /// Directory for downloaded audio files.
    pub temp_dir: PathBuf,
    /// Downloader binary.
    pub yt_dlp_bin: String,
    /// Upper bound for one audio download.
    pub download_timeout: Duration,
    /// Inference threads; `None` lets whisper decide.
    pub threads: Option<usize>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: None,
            temp_dir: std::env::temp_dir().join("recap-audio"),
            yt_dlp_bin: "yt-dlp".to_string(),
            download_timeout: Duration::from_secs(600),
            threads: None,
        }
    }
}

/// Whisper-backed transcriber. Construction never fails; a missing model
/// surfaces per item as a retryable [`TranscribeError`], matching the
/// skip-and-retry-later policy of the pipeline.
pub struct WhisperTranscriber {
    config: SttConfig,
    model_name: String,
    #[cfg(feature = "whisper")]
    context: Mutex<Option<WhisperContext>>,
}

impl WhisperTranscriber {
    pub fn new(config: SttConfig) -> Self {
        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self {
            config,
            model_name,
            #[cfg(feature = "whisper")]
            context: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SttConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Download the item's audio track as a 16 kHz mono WAV and return its path.
    async fn download_audio(&self, item: &Item) -> Result<PathBuf, TranscribeError> {
        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|e| TranscribeError::Download(e.to_string()))?;

        let output_path = self.config.temp_dir.join(format!("{}.wav", item.id));

        let mut command = Command::new(&self.config.yt_dlp_bin);
        command
            .arg("--extract-audio")
            .args(["--audio-format", "wav"])
            .args(["--postprocessor-args", "ffmpeg:-ar 16000 -ac 1"])
            .args(["--output", &output_path.to_string_lossy()])
            .args(["--quiet", "--no-progress", "--force-overwrites"])
            .arg(&item.url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Downloading audio for '{}' to {:?}", item.id, output_path);

        let child = command
            .spawn()
            .map_err(|e| TranscribeError::Download(format!("failed to spawn downloader: {}", e)))?;

        let output = timeout(self.config.download_timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                TranscribeError::Download(format!(
                    "download timed out after {:?}",
                    self.config.download_timeout
                ))
            })?
            .map_err(|e| TranscribeError::Download(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::Download(format!(
                "downloader exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !output_path.exists() {
            return Err(TranscribeError::Download(
                "downloader reported success but produced no file".to_string(),
            ));
        }

        Ok(output_path)
    }
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Run inference over 16 kHz mono samples. Blocking; keep it off the
    /// async executor.
    fn run_inference(&self, samples: Vec<f32>) -> Result<String, TranscribeError> {
        let mut guard = self
            .context
            .lock()
            .map_err(|e| TranscribeError::Inference(format!("context lock poisoned: {}", e)))?;

        if guard.is_none() {
            if !self.config.model_path.exists() {
                return Err(TranscribeError::ModelNotFound {
                    path: self.config.model_path.to_string_lossy().to_string(),
                });
            }
            info!("Loading whisper model '{}'", self.model_name);
            let path = self.config.model_path.to_str().ok_or_else(|| {
                TranscribeError::Inference("invalid UTF-8 in model path".to_string())
            })?;
            let context =
                WhisperContext::new_with_params(path, WhisperContextParameters::default())
                    .map_err(|e| TranscribeError::Inference(format!("model load failed: {}", e)))?;
            *guard = Some(context);
        }

        let context = guard.as_ref().ok_or_else(|| {
            TranscribeError::Inference("whisper context unavailable".to_string())
        })?;
        let mut state = context
            .create_state()
            .map_err(|e| TranscribeError::Inference(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.config.language.as_deref());
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| TranscribeError::Inference(e.to_string()))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }
        Ok(text.trim().to_string())
    }

    fn read_samples(path: &std::path::Path) -> Result<Vec<f32>, TranscribeError> {
        let mut reader =
            hound::WavReader::open(path).map_err(|e| TranscribeError::Inference(e.to_string()))?;
        let samples: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
        let samples = samples.map_err(|e| TranscribeError::Inference(e.to_string()))?;
        // Whisper expects f32 in [-1.0, 1.0].
        Ok(samples.iter().map(|&s| s as f32 / 32768.0).collect())
    }
}

#[cfg(feature = "whisper")]
#[async_trait]
impl AudioTranscriber for WhisperTranscriber {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn transcribe(&self, item: &Item) -> Result<String, TranscribeError> {
        // Fail before the expensive download if the model is missing.
        if !self.config.model_path.exists() {
            return Err(TranscribeError::ModelNotFound {
                path: self.config.model_path.to_string_lossy().to_string(),
            });
        }

        let audio_path = self.download_audio(item).await?;

        let result = {
            let samples = Self::read_samples(&audio_path);
            match samples {
                Ok(samples) => {
                    info!(
                        "Transcribing '{}' ({} samples) with '{}'",
                        item.id,
                        samples.len(),
                        self.model_name
                    );
                    // Inference is CPU-bound; keep it off the async executor.
                    tokio::task::block_in_place(|| self.run_inference(samples))
                }
                Err(e) => Err(e),
            }
        };

        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            warn!("Failed to remove temp audio {:?}: {}", audio_path, e);
        }

        result
    }
}

#[cfg(not(feature = "whisper"))]
#[async_trait]
impl AudioTranscriber for WhisperTranscriber {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn transcribe(&self, _item: &Item) -> Result<String, TranscribeError> {
        Err(TranscribeError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_default_config() {
        let config = SttConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.yt_dlp_bin, "yt-dlp");
        assert!(config.language.is_none());
    }

    #[test]
    fn test_model_name_from_path() {
        let transcriber = WhisperTranscriber::new(SttConfig {
            model_path: PathBuf::from("/models/ggml-small.bin"),
            ..SttConfig::default()
        });
        assert_eq!(transcriber.model_name(), "ggml-small");
    }

    #[cfg(not(feature = "whisper"))]
    #[tokio::test]
    async fn test_stub_reports_disabled() {
        let transcriber = WhisperTranscriber::new(SttConfig::default());
        let item = fixtures::video_item("vid-1", "A video");
        let err = transcriber.transcribe(&item).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Disabled));
    }

    #[cfg(feature = "whisper")]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_model_fails_before_download() {
        let transcriber = WhisperTranscriber::new(SttConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..SttConfig::default()
        });
        let item = fixtures::video_item("vid-1", "A video");
        let err = transcriber.transcribe(&item).await.unwrap_err();
        assert!(matches!(err, TranscribeError::ModelNotFound { .. }));
    }

    #[test]
    fn test_transcriber_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WhisperTranscriber>();
    }
}
