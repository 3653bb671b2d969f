//! Span ingestion: normalisation, roll-up, and the shared pipeline

pub mod normalize;
pub mod pipeline;
pub mod rollup;

pub use pipeline::{IngestError, IngestPipeline};
