//! End-to-end run tests with real persistence.
//!
//! These tests run the full pipeline against the real file ledger and the
//! real markdown publisher in temp directories, with mocks only at the
//! network seams (discovery, captions, speech-to-text, summarization):
//! - dedup survives across separate runner instances sharing a ledger dir
//! - failed items are retried and recover
//! - markdown artifacts land on disk with the expected names

use std::sync::Arc;

use tempfile::TempDir;

use recap_core::{
    extractor::ContentExtractor,
    ledger::FileLedger,
    publisher::MarkdownPublisher,
    testing::{
        fixtures, MockArticleFetcher, MockCaptionSource, MockSourceReader, MockSummarizer,
        MockTranscriber,
    },
    PipelineRunner,
};

struct TestHarness {
    reader: Arc<MockSourceReader>,
    captions: Arc<MockCaptionSource>,
    summarizer: Arc<MockSummarizer>,
    ledger_dir: TempDir,
    output_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            reader: Arc::new(MockSourceReader::new()),
            captions: Arc::new(MockCaptionSource::new()),
            summarizer: Arc::new(MockSummarizer::new()),
            ledger_dir: TempDir::new().expect("Failed to create ledger dir"),
            output_dir: TempDir::new().expect("Failed to create output dir"),
        }
    }

    /// Build a fresh runner over the shared ledger and output directories,
    /// as if the process had been restarted.
    fn runner(&self) -> PipelineRunner {
        let ledger =
            Arc::new(FileLedger::open(self.ledger_dir.path()).expect("Failed to open ledger"));
        let extractor = ContentExtractor::new(
            Arc::clone(&self.captions) as _,
            Arc::new(MockTranscriber::new()),
            Arc::new(MockArticleFetcher::new()),
        );
        PipelineRunner::new(
            vec![fixtures::channel_source("chan", "UC1")],
            ledger,
            extractor,
            Arc::clone(&self.summarizer) as _,
        )
        .with_reader(Arc::clone(&self.reader) as _)
        .with_publisher(Arc::new(MarkdownPublisher::new(self.output_dir.path())))
    }

    fn markdown_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output_dir.path())
            .expect("Failed to read output dir")
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

#[tokio::test]
async fn dedup_survives_process_restart() {
    let harness = TestHarness::new();
    harness
        .reader
        .set_items("UC1", vec![fixtures::video_item("vid-1", "First talk")]);
    harness.captions.set_transcript("vid-1", "transcript text");

    let first = harness.runner().run().await;
    assert_eq!(first.processed, 1);
    assert_eq!(harness.markdown_files().len(), 1);

    // Fresh runner, fresh ledger instance, same directory.
    let second = harness.runner().run().await;
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(harness.summarizer.call_count(), 1);
}

#[tokio::test]
async fn failed_item_recovers_across_restarts() {
    let harness = TestHarness::new();
    harness
        .reader
        .set_items("UC1", vec![fixtures::video_item("vid-1", "First talk")]);

    // No captions, no transcriber text: the first run fails the item.
    let first = harness.runner().run().await;
    assert_eq!(first.failed, 1);
    assert!(harness.markdown_files().is_empty());

    // Captions published upstream before the next run.
    harness.captions.set_transcript("vid-1", "late transcript");
    let second = harness.runner().run().await;
    assert_eq!(second.processed, 1);

    // Now settled; a third run touches nothing.
    let third = harness.runner().run().await;
    assert_eq!(third.skipped, 1);
    assert_eq!(harness.markdown_files().len(), 1);
}

#[tokio::test]
async fn markdown_artifact_has_expected_shape() {
    let harness = TestHarness::new();
    let mut item = fixtures::video_item("vid-1", "A talk: two/parts");
    item.published_at = Some(
        chrono::DateTime::parse_from_rfc3339("2024-06-15T10:00:00Z")
            .unwrap()
            .to_utc(),
    );
    harness.reader.set_items("UC1", vec![item]);
    harness.captions.set_transcript("vid-1", "the full transcript");
    harness.summarizer.set_response("three key points");

    harness.runner().run().await;

    let files = harness.markdown_files();
    assert_eq!(files, vec!["20240615_A_talk_two_parts.md".to_string()]);

    let content =
        std::fs::read_to_string(harness.output_dir.path().join(&files[0])).unwrap();
    assert!(content.contains("# A talk: two/parts"));
    assert!(content.contains("three key points"));
    assert!(content.contains("the full transcript"));
}

#[tokio::test]
async fn new_items_processed_alongside_old_ones() {
    let harness = TestHarness::new();
    harness
        .reader
        .set_items("UC1", vec![fixtures::video_item("vid-1", "First")]);
    harness.captions.set_transcript("vid-1", "one");
    harness.runner().run().await;

    // Upstream adds a second video.
    harness.reader.set_items(
        "UC1",
        vec![
            fixtures::video_item("vid-1", "First"),
            fixtures::video_item("vid-2", "Second"),
        ],
    );
    harness.captions.set_transcript("vid-2", "two");

    let report = harness.runner().run().await;
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(harness.markdown_files().len(), 2);
}
