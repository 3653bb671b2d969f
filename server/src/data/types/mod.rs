//! Shared data types across all backends

mod api_key;
mod dataset;
mod example;
mod experiment;
mod model;
mod organization;
mod span;

pub use api_key::{ApiKeyRole, ApiKeyValidation};
pub use dataset::{Dataset, Metric, MetricKind};
pub use example::{Example, ExampleOutputs, ExampleSpan};
pub use experiment::{Experiment, ExperimentResult, ExperimentStatus, SummaryStats};
pub use model::{Model, ModelProvider};
pub use organization::{Organization, SubscriptionTier};
pub use span::{Span, SpanStatus};
