//! Message ingestion: per-message record extraction and the import pipeline.

pub mod extract;
pub mod pipeline;

pub use pipeline::{ImportPipeline, ImportSummary};
