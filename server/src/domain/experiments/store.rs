//! Server side of the experiment engine: score-and-store
//!
//! Scores an engine output against the dataset's (plus the example's)
//! metrics, upserts the per-example result, and folds the new scores into
//! the experiment's running summaries. Individual metric failures surface
//! as per-metric errors, never as a whole-request failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::summary::update_summary;
use crate::data::postgres::{PostgresError, PostgresService, repositories};
use crate::data::search::{SearchError, SearchService};
use crate::data::types::{Example, Experiment, ExperimentResult, Metric};
use crate::domain::scoring::Scorer;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Experiment belongs to another organisation")]
    Forbidden,

    #[error("Example not found: {0}")]
    ExampleNotFound(String),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl From<PostgresError> for StoreError {
    fn from(e: PostgresError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<SearchError> for StoreError {
    fn from(e: SearchError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

/// Outcome returned to the caller as `{success, scores, exampleId}`
#[derive(Debug)]
pub struct ScoreOutcome {
    pub example_id: String,
    pub scores: BTreeMap<String, f64>,
    pub errors: BTreeMap<String, String>,
}

#[allow(clippy::too_many_arguments)]
pub async fn score_and_store(
    database: &Arc<PostgresService>,
    search: &Arc<SearchService>,
    scorer: &Arc<Scorer>,
    org_id: &str,
    experiment_id: &str,
    example_id: &str,
    output: &JsonValue,
    trace_id: Option<String>,
    client_scores: &BTreeMap<String, f64>,
) -> Result<ScoreOutcome, StoreError> {
    let mut experiment = repositories::experiment::get(database.pool(), experiment_id)
        .await?
        .ok_or_else(|| StoreError::ExperimentNotFound(experiment_id.to_string()))?;

    if experiment.organisation != org_id {
        return Err(StoreError::Forbidden);
    }

    let example = search
        .get_example(example_id, &experiment.dataset, org_id)
        .await?
        .ok_or_else(|| StoreError::ExampleNotFound(example_id.to_string()))?;

    // Dataset metrics plus example-specific ones
    let dataset = repositories::dataset::get(database.pool(), &experiment.dataset).await?;
    let mut metrics: Vec<Metric> = dataset.map(|d| d.metrics).unwrap_or_default();
    if let Some(example_metrics) = &example.metrics {
        metrics.extend(example_metrics.iter().cloned());
    }

    let (scores, errors) =
        collect_scores(scorer, &metrics, client_scores, output, &example, org_id).await;

    upsert_result(&mut experiment, example_id, trace_id, &scores, &errors);

    // Fold the new scores into the running summaries. Overwritten entries
    // are not rolled back here; recalculate_summary_results handles that.
    for (metric, value) in &scores {
        update_summary(&mut experiment.summaries, metric, *value);
    }

    repositories::experiment::update(database.pool(), &experiment).await?;

    Ok(ScoreOutcome {
        example_id: example_id.to_string(),
        scores,
        errors,
    })
}

/// Client-supplied scores pass through as-is; everything else the server
/// can compute goes through the scorer. Metric failures land in `errors`.
async fn collect_scores(
    scorer: &Arc<Scorer>,
    metrics: &[Metric],
    client_scores: &BTreeMap<String, f64>,
    output: &JsonValue,
    example: &Example,
    org_id: &str,
) -> (BTreeMap<String, f64>, BTreeMap<String, String>) {
    let mut scores = client_scores.clone();
    let mut errors = BTreeMap::new();

    for metric in metrics {
        if scores.contains_key(&metric.id) {
            continue;
        }

        match scorer.score_metric(metric, output, example, org_id).await {
            Ok(Some(value)) => {
                scores.insert(metric.id.clone(), value);
            }
            // number/system without a client score is skipped
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(metric = %metric.id, error = %e, "Metric scoring failed");
                errors.insert(metric.id.clone(), e.to_string());
            }
        }
    }

    (scores, errors)
}

/// Upsert the result entry by example id: merge scores (new keys overwrite
/// old), update the trace reference, replace errors
fn upsert_result(
    experiment: &mut Experiment,
    example_id: &str,
    trace_id: Option<String>,
    scores: &BTreeMap<String, f64>,
    errors: &BTreeMap<String, String>,
) {
    if let Some(trace) = &trace_id
        && !experiment.traces.contains(trace)
    {
        experiment.traces.push(trace.clone());
    }

    match experiment
        .results
        .iter_mut()
        .find(|r| r.example_id == example_id)
    {
        Some(existing) => {
            for (key, value) in scores {
                existing.scores.insert(key.clone(), *value);
            }
            if trace_id.is_some() {
                existing.trace_id = trace_id;
            }
            existing.errors = (!errors.is_empty()).then(|| errors.clone());
        }
        None => experiment.results.push(ExperimentResult {
            example_id: example_id.to_string(),
            trace_id,
            scores: scores.clone(),
            messages: None,
            errors: (!errors.is_empty()).then(|| errors.clone()),
            rate_limited: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experiment_with_result(example_id: &str, scores: &[(&str, f64)]) -> Experiment {
        let mut experiment = Experiment::default();
        experiment.results.push(ExperimentResult {
            example_id: example_id.to_string(),
            scores: scores
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            ..Default::default()
        });
        experiment
    }

    #[test]
    fn test_upsert_appends_new_result() {
        let mut experiment = Experiment::default();
        let scores = BTreeMap::from([("cost".to_string(), 0.002)]);
        upsert_result(
            &mut experiment,
            "e1",
            Some("t1".into()),
            &scores,
            &BTreeMap::new(),
        );

        assert_eq!(experiment.results.len(), 1);
        assert_eq!(experiment.results[0].example_id, "e1");
        assert_eq!(experiment.results[0].scores["cost"], 0.002);
        assert_eq!(experiment.traces, vec!["t1".to_string()]);
    }

    #[test]
    fn test_upsert_merges_existing_result() {
        let mut experiment = experiment_with_result("e1", &[("cost", 0.002), ("old", 1.0)]);
        let scores = BTreeMap::from([("cost".to_string(), 0.005), ("cats".to_string(), 7.0)]);
        upsert_result(&mut experiment, "e1", None, &scores, &BTreeMap::new());

        // No duplicate entry; new keys overwrite, untouched keys survive
        assert_eq!(experiment.results.len(), 1);
        let result = &experiment.results[0];
        assert_eq!(result.scores["cost"], 0.005);
        assert_eq!(result.scores["cats"], 7.0);
        assert_eq!(result.scores["old"], 1.0);
    }

    #[test]
    fn test_upsert_records_errors() {
        let mut experiment = Experiment::default();
        let errors = BTreeMap::from([("cats".to_string(), "Script error: boom".to_string())]);
        upsert_result(&mut experiment, "e1", None, &BTreeMap::new(), &errors);

        let result = &experiment.results[0];
        assert_eq!(
            result.errors.as_ref().unwrap()["cats"],
            "Script error: boom"
        );
    }

    #[test]
    fn test_upsert_keeps_trace_list_unique() {
        let mut experiment = Experiment::default();
        let scores = BTreeMap::new();
        upsert_result(&mut experiment, "e1", Some("t1".into()), &scores, &BTreeMap::new());
        upsert_result(&mut experiment, "e2", Some("t1".into()), &scores, &BTreeMap::new());
        assert_eq!(experiment.traces.len(), 1);
    }
}
