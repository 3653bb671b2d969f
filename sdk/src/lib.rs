//! AIQA client SDK
//!
//! A typed HTTP client for the AIQA evaluation backend plus the experiment
//! runner: iterate a dataset's examples, invoke your engine under a matrix
//! of parameter sets, and store outputs and scores.
//!
//! ```no_run
//! use aiqa::{AiqaClient, Engine, ExperimentRunner};
//! use async_trait::async_trait;
//! use serde_json::{Map, Value};
//!
//! struct MyEngine;
//!
//! #[async_trait]
//! impl Engine for MyEngine {
//!     async fn run(
//!         &self,
//!         input: &Value,
//!         _parameters: &Map<String, Value>,
//!     ) -> Result<Value, aiqa::AiqaError> {
//!         Ok(input.clone())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), aiqa::AiqaError> {
//! let client = AiqaClient::from_env()?;
//! let report = ExperimentRunner::new(client, "my-dataset")
//!     .name("baseline")
//!     .run(&MyEngine, None)
//!     .await?;
//! println!("{} outcomes", report.outcomes.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod runner;
mod types;

pub use client::{AiqaClient, ENV_API_KEY, ENV_SERVER_URL};
pub use error::AiqaError;
pub use runner::{
    DEFAULT_EXAMPLE_LIMIT, Engine, ExperimentRunner, OutputScorer, RunOutcome, RunReport,
};
pub use types::{
    CreateExperiment, Example, ExampleOutputs, Experiment, ScoreAndStoreRequest,
    ScoreAndStoreResponse,
};
