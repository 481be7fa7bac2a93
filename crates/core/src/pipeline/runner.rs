//! The run loop: discover, dedup, extract, summarize, publish, record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::types::{ItemOutcome, RunReport, RunSettings};
use crate::extractor::ContentExtractor;
use crate::ledger::Ledger;
use crate::metrics;
use crate::publisher::Publisher;
use crate::source::{Item, SourceDescriptor, SourceReader};
use crate::summarizer::Summarizer;

/// Drives one end-to-end run over the configured sources.
///
/// Failure containment rules:
/// - a source whose discovery fails is skipped; the run continues.
/// - an item whose extraction or summarization fails is marked failed and
///   retried on a later run; the run continues.
/// - a failing publisher never blocks the other publishers or the item's
///   processed state.
pub struct PipelineRunner {
    sources: Vec<SourceDescriptor>,
    readers: Vec<Arc<dyn SourceReader>>,
    ledger: Arc<dyn Ledger>,
    extractor: ContentExtractor,
    summarizer: Arc<dyn Summarizer>,
    publishers: Vec<Arc<dyn Publisher>>,
    settings: RunSettings,
    stop: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(
        sources: Vec<SourceDescriptor>,
        ledger: Arc<dyn Ledger>,
        extractor: ContentExtractor,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            sources,
            readers: Vec::new(),
            ledger,
            extractor,
            summarizer,
            publishers: Vec::new(),
            settings: RunSettings::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a source reader. Readers are consulted in registration order;
    /// the first whose `handles` accepts the source type wins.
    pub fn with_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.readers.push(reader);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Flag checked at item boundaries; setting it makes the run wind down
    /// without leaving the current item half-recorded.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Execute one full run.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();

        info!(
            "Starting run: {} sources, {} publishers, summarizer {}/{}",
            self.sources.len(),
            self.publishers.len(),
            self.summarizer.provider(),
            self.summarizer.model()
        );

        'sources: for source in &self.sources {
            if self.stopped() {
                info!("Stop requested, ending run");
                break;
            }
            if !source.enabled {
                debug!("Source '{}' disabled, skipping", source.name);
                continue;
            }

            let Some(reader) = self
                .readers
                .iter()
                .find(|r| r.handles(source.source_type))
            else {
                warn!(
                    "No reader handles source '{}' ({}), skipping",
                    source.name,
                    source.source_type.as_str()
                );
                report.skipped_sources += 1;
                continue;
            };

            let items = match reader.list_items(source).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("Discovery failed for source '{}': {}", source.name, e);
                    metrics::SOURCES_SKIPPED.inc();
                    report.skipped_sources += 1;
                    continue;
                }
            };

            metrics::ITEMS_DISCOVERED
                .with_label_values(&[source.source_type.as_str()])
                .inc_by(items.len() as u64);
            info!("Source '{}': {} items", source.name, items.len());

            for item in &items {
                if self.stopped() {
                    info!("Stop requested, ending run");
                    break 'sources;
                }

                report.items_seen += 1;
                let outcome = self.process_item(item).await;
                metrics::RUN_ITEMS
                    .with_label_values(&[outcome.as_str()])
                    .inc();
                match outcome {
                    ItemOutcome::Processed => report.processed += 1,
                    ItemOutcome::Failed => report.failed += 1,
                    ItemOutcome::Skipped => report.skipped += 1,
                }

                if outcome != ItemOutcome::Skipped && !self.settings.item_delay.is_zero() {
                    tokio::time::sleep(self.settings.item_delay).await;
                }
            }
        }

        metrics::RUN_DURATION.observe(started.elapsed().as_secs_f64());
        info!("Run finished: {}", report);
        report
    }

    async fn process_item(&self, item: &Item) -> ItemOutcome {
        match self.ledger.is_processed(&item.id) {
            Ok(true) => {
                debug!("'{}' already processed, skipping", item.id);
                return ItemOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                // Without a readable ledger the item may already be done;
                // skipping avoids a duplicate publish.
                warn!("Ledger read failed for '{}': {}", item.id, e);
                return ItemOutcome::Skipped;
            }
        }
        match self.ledger.is_permanently_failed(&item.id) {
            Ok(true) => {
                debug!("'{}' permanently excluded, skipping", item.id);
                return ItemOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Ledger read failed for '{}': {}", item.id, e);
                return ItemOutcome::Skipped;
            }
        }
        let was_failed = match self.ledger.is_failed(&item.id) {
            Ok(failed) => failed,
            Err(e) => {
                warn!("Ledger read failed for '{}': {}", item.id, e);
                return ItemOutcome::Skipped;
            }
        };
        if was_failed {
            info!("Retrying previously failed item '{}'", item.id);
        }

        let record = match self.extractor.extract(item).await {
            Ok(record) => record,
            Err(e) => {
                warn!("{}", e);
                self.record_failure(&item.id, &e.to_string());
                return ItemOutcome::Failed;
            }
        };

        let summary = match self
            .summarizer
            .summarize(&record.title, &record.body_text)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summarization failed for '{}': {}", item.id, e);
                self.record_failure(&item.id, &format!("summarize: {}", e));
                return ItemOutcome::Failed;
            }
        };

        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&record, &summary).await {
                warn!(
                    "Publisher '{}' failed for '{}': {}",
                    publisher.name(),
                    item.id,
                    e
                );
                metrics::PUBLISH_FAILURES
                    .with_label_values(&[publisher.name()])
                    .inc();
            }
        }

        let result = if was_failed {
            self.ledger.mark_recovered(&item.id)
        } else {
            self.ledger.mark_processed(&item.id)
        };
        if let Err(e) = result {
            // The artifacts exist but the ledger missed the success; a later
            // run may publish this item again.
            error!("Ledger write failed for '{}': {}", item.id, e);
        }

        info!(
            "Processed '{}' ({}) via {}",
            item.id,
            record.title,
            record.extraction_method.as_str()
        );
        ItemOutcome::Processed
    }

    fn record_failure(&self, item_id: &str, reason: &str) {
        if let Err(e) = self.ledger.mark_failed(item_id, reason) {
            error!("Ledger write failed for '{}': {}", item_id, e);
        }
    }
}
