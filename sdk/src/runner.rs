//! Experiment runner
//!
//! Iterates the examples of a dataset, invokes the user's engine under each
//! parameter set, and reports output + scores to the server's
//! `scoreAndStore` endpoint.
//!
//! # Sequential execution contract
//!
//! Parameter sets are applied by mutating the process environment before
//! each engine invocation, so the inner loop over parameter sets is
//! strictly sequential — running parameter sets in parallel would let one
//! set's environment leak into another's invocation. Keep this contract
//! even though the runtime would permit cheap parallelism. Examples are
//! iterated sequentially as well (the reference order).

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::client::AiqaClient;
use crate::error::AiqaError;
use crate::types::{CreateExperiment, Example, ScoreAndStoreRequest};

/// Default bound on the number of examples fetched per run
pub const DEFAULT_EXAMPLE_LIMIT: usize = 10_000;

/// User code invoked once per (example, parameter set)
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(
        &self,
        input: &JsonValue,
        parameters: &Map<String, JsonValue>,
    ) -> Result<JsonValue, AiqaError>;
}

/// Optional client-side scorer producing a scores map for an output
#[async_trait]
pub trait OutputScorer: Send + Sync {
    async fn score(&self, output: &JsonValue, example: &Example) -> BTreeMap<String, f64>;
}

/// Outcome of one (example, parameter set) invocation
#[derive(Debug)]
pub struct RunOutcome {
    pub example_id: String,
    pub scores: BTreeMap<String, f64>,
    pub error: Option<String>,
}

/// Summary of a whole run
#[derive(Debug)]
pub struct RunReport {
    pub experiment_id: String,
    pub outcomes: Vec<RunOutcome>,
}

pub struct ExperimentRunner {
    client: AiqaClient,
    dataset: String,
    experiment_id: Option<String>,
    name: Option<String>,
    parameters: Map<String, JsonValue>,
    /// Additional parameter sets crossed with `parameters`. Honoured for
    /// compatibility; planned to be superseded by linked experiments
    /// sharing a `batch` identifier.
    comparison_parameters: Vec<Map<String, JsonValue>>,
    example_limit: usize,
}

impl ExperimentRunner {
    pub fn new(client: AiqaClient, dataset: impl Into<String>) -> Self {
        Self {
            client,
            dataset: dataset.into(),
            experiment_id: None,
            name: None,
            parameters: Map::new(),
            comparison_parameters: Vec::new(),
            example_limit: DEFAULT_EXAMPLE_LIMIT,
        }
    }

    /// Reuse an existing experiment instead of creating one
    pub fn experiment(mut self, id: impl Into<String>) -> Self {
        self.experiment_id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn parameters(mut self, parameters: Map<String, JsonValue>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn comparison_parameters(mut self, sets: Vec<Map<String, JsonValue>>) -> Self {
        self.comparison_parameters = sets;
        self
    }

    pub fn example_limit(mut self, limit: usize) -> Self {
        self.example_limit = limit;
        self
    }

    /// Run the engine over every example × parameter set and store scores
    pub async fn run(
        &self,
        engine: &dyn Engine,
        scorer: Option<&dyn OutputScorer>,
    ) -> Result<RunReport, AiqaError> {
        let experiment_id = match &self.experiment_id {
            Some(id) => self.client.get_experiment(id).await?.id,
            None => {
                let created = self
                    .client
                    .create_experiment(&CreateExperiment {
                        dataset: self.dataset.clone(),
                        name: self.name.clone(),
                        batch: None,
                        parameters: self.parameters.clone(),
                    })
                    .await?;
                created.id
            }
        };

        let examples = self
            .client
            .list_examples(&self.dataset, self.example_limit)
            .await?;
        tracing::debug!(
            experiment = %experiment_id,
            examples = examples.len(),
            "Starting experiment run"
        );

        let parameter_sets = self.parameter_sets();
        let mut outcomes = Vec::new();

        for example in &examples {
            // Strictly sequential: each set mutates the shared environment
            for set in &parameter_sets {
                let outcome = self
                    .run_one(&experiment_id, example, set, engine, scorer)
                    .await;
                outcomes.push(outcome);
            }
        }

        Ok(RunReport {
            experiment_id,
            outcomes,
        })
    }

    async fn run_one(
        &self,
        experiment_id: &str,
        example: &Example,
        parameters: &Map<String, JsonValue>,
        engine: &dyn Engine,
        scorer: Option<&dyn OutputScorer>,
    ) -> RunOutcome {
        apply_environment(parameters);

        let input = example.input.clone().unwrap_or(JsonValue::Null);
        let started = Instant::now();
        let output = engine.run(&input, parameters).await;
        let duration_ms = started.elapsed().as_millis() as f64;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(example = %example.id, error = %e, "Engine failed");
                return RunOutcome {
                    example_id: example.id.clone(),
                    scores: BTreeMap::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let mut scores = match scorer {
            Some(scorer) => scorer.score(&output, example).await,
            None => BTreeMap::new(),
        };
        scores.insert("duration".to_string(), duration_ms);

        match self
            .client
            .score_and_store(
                experiment_id,
                &example.id,
                &ScoreAndStoreRequest {
                    output,
                    trace_id: example.trace.clone(),
                    scores,
                },
            )
            .await
        {
            Ok(response) => RunOutcome {
                example_id: response.example_id,
                scores: response.scores,
                error: response
                    .errors
                    .filter(|errors| !errors.is_empty())
                    .map(|errors| {
                        errors
                            .into_iter()
                            .map(|(metric, message)| format!("{metric}: {message}"))
                            .collect::<Vec<_>>()
                            .join("; ")
                    }),
            },
            Err(e) => RunOutcome {
                example_id: example.id.clone(),
                scores: BTreeMap::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// `parameters × comparison_parameters[]`, defaulting to one empty set
    fn parameter_sets(&self) -> Vec<Map<String, JsonValue>> {
        let comparisons: &[Map<String, JsonValue>] = if self.comparison_parameters.is_empty() {
            &[Map::new()]
        } else {
            &self.comparison_parameters
        };

        comparisons
            .iter()
            .map(|comparison| {
                let mut merged = self.parameters.clone();
                for (key, value) in comparison {
                    merged.insert(key.clone(), value.clone());
                }
                merged
            })
            .collect()
    }
}

/// Export string-valued parameters into the process environment.
///
/// Mutating the environment is the documented channel to the engine code;
/// it is only sound because the runner never overlaps invocations.
fn apply_environment(parameters: &Map<String, JsonValue>) {
    for (key, value) in parameters {
        if let JsonValue::String(value) = value {
            // SAFETY: invocations are strictly sequential (see module docs);
            // no other thread reads the environment concurrently.
            unsafe { std::env::set_var(key, value) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn runner_with(
        parameters: Map<String, JsonValue>,
        comparisons: Vec<Map<String, JsonValue>>,
    ) -> ExperimentRunner {
        ExperimentRunner::new(AiqaClient::new("http://localhost:4318", "key"), "d1")
            .parameters(parameters)
            .comparison_parameters(comparisons)
    }

    fn map(pairs: &[(&str, JsonValue)]) -> Map<String, JsonValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parameter_sets_default_single_empty() {
        let runner = runner_with(Map::new(), Vec::new());
        let sets = runner.parameter_sets();
        assert_eq!(sets.len(), 1);
        assert!(sets[0].is_empty());
    }

    #[test]
    fn test_parameter_sets_comparison_overrides_base() {
        let runner = runner_with(
            map(&[("MODEL", json!("base")), ("TEMP", json!("0"))]),
            vec![map(&[("MODEL", json!("a"))]), map(&[("MODEL", json!("b"))])],
        );
        let sets = runner.parameter_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0]["MODEL"], json!("a"));
        assert_eq!(sets[0]["TEMP"], json!("0"));
        assert_eq!(sets[1]["MODEL"], json!("b"));
    }

    #[test]
    fn test_apply_environment_strings_only() {
        apply_environment(&map(&[
            ("AIQA_TEST_RUNNER_VAR", json!("hello")),
            ("AIQA_TEST_RUNNER_NUM", json!(42)),
        ]));
        assert_eq!(
            std::env::var("AIQA_TEST_RUNNER_VAR").as_deref(),
            Ok("hello")
        );
        // Non-string values are not exported
        assert!(std::env::var("AIQA_TEST_RUNNER_NUM").is_err());
    }
}
