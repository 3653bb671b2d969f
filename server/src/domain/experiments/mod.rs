//! Experiment engine, server side: result persistence and rolling summaries

pub mod store;
pub mod summary;

pub use store::{ScoreOutcome, StoreError, score_and_store};
pub use summary::{recalculate_summary_results, update_summary};
