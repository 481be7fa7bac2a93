pub mod config;
pub mod extractor;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod source;
pub mod summarizer;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LedgerBackend,
    SanitizedConfig, SummarizerProvider,
};
pub use extractor::{ContentExtractor, ContentRecord, ExtractionError, ExtractionMethod};
pub use ledger::{create_ledger, Ledger, LedgerError};
pub use pipeline::{PipelineRunner, RunReport, RunSettings};
pub use publisher::{PublishError, Publisher};
pub use source::{Item, SourceDescriptor, SourceError, SourceReader, SourceType};
pub use summarizer::{SummarizeError, Summarizer};
