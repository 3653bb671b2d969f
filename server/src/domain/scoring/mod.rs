//! Metric scoring: sandboxed user code, LLM-as-judge, and deterministic
//! comparisons

pub mod compare;
pub mod judge;
pub mod sandbox;
mod scorer;

pub use scorer::Scorer;

use thiserror::Error;

/// Per-metric scoring failure; surfaced inside the successful response
/// under `errors[metricName]`, never as a whole-request failure
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Script execution timed out")]
    Timeout,

    #[error("Script error: {0}")]
    Script(String),

    #[error("Script result is not a finite number")]
    NonFinite,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider request failed: {0}")]
    Provider(String),

    #[error("No finite number in model response")]
    NoNumber,

    #[error("Metric is missing {0}")]
    Misconfigured(String),

    #[error("{0}")]
    Internal(String),
}
