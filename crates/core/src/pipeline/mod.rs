//! Run orchestration: wires sources, ledger, extractor, summarizer and
//! publishers into one sequential pass.

mod runner;
mod types;

pub use runner::PipelineRunner;
pub use types::{RunReport, RunSettings};
