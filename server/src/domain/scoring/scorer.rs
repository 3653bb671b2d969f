//! Metric scoring dispatch
//!
//! Evaluates one metric against an (output, example) pair. number/system
//! metrics are client-supplied and skipped here; javascript runs in the
//! sandbox; llm goes through the provider judge; the comparison kinds are
//! deterministic.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::judge::Judge;
use super::{ScoreError, compare, sandbox};
use crate::data::postgres::{PostgresService, repositories};
use crate::data::types::{Example, Metric, MetricKind};

pub struct Scorer {
    database: Arc<PostgresService>,
    judge: Judge,
}

impl Scorer {
    pub fn new(database: Arc<PostgresService>) -> Self {
        Self {
            database,
            judge: Judge::new(),
        }
    }

    /// Score one metric. `Ok(None)` means the metric is not computed
    /// server-side (number/system without a client-supplied score).
    pub async fn score_metric(
        &self,
        metric: &Metric,
        output: &JsonValue,
        example: &Example,
        org_id: &str,
    ) -> Result<Option<f64>, ScoreError> {
        match metric.kind {
            // Values come from the client's `scores` map; nothing to compute
            MetricKind::Number | MetricKind::System => Ok(None),

            MetricKind::Javascript => {
                let code = metric
                    .code
                    .as_deref()
                    .ok_or_else(|| ScoreError::Misconfigured("code".into()))?;
                let example_json = serde_json::to_value(example)
                    .map_err(|e| ScoreError::Internal(e.to_string()))?;
                sandbox::evaluate(code, output, &example_json)
                    .await
                    .map(Some)
            }

            MetricKind::Llm => {
                let reference = metric
                    .model
                    .as_deref()
                    .or(metric.provider.as_deref())
                    .ok_or_else(|| ScoreError::Misconfigured("model".into()))?;
                let model = repositories::model::get_for_org(
                    self.database.pool(),
                    org_id,
                    reference,
                )
                .await
                .map_err(|e| ScoreError::Internal(e.to_string()))?
                .ok_or_else(|| ScoreError::ModelNotFound(reference.to_string()))?;

                self.judge.score(&model, metric, output, example).await.map(Some)
            }

            MetricKind::Contains
            | MetricKind::Equals
            | MetricKind::NotContains
            | MetricKind::NotEquals
            | MetricKind::Similar => {
                let good = example
                    .outputs
                    .as_ref()
                    .and_then(|o| o.good.as_ref())
                    .ok_or_else(|| ScoreError::Misconfigured("example outputs.good".into()))?;
                Ok(Some(compare_score(metric.kind, output, good)))
            }
        }
    }
}

fn compare_score(kind: MetricKind, output: &JsonValue, good: &JsonValue) -> f64 {
    let pass = match kind {
        MetricKind::Contains => compare::contains(output, good),
        MetricKind::NotContains => !compare::contains(output, good),
        MetricKind::Equals => compare::equals(output, good),
        MetricKind::NotEquals => !compare::equals(output, good),
        MetricKind::Similar => return compare::similarity(output, good),
        _ => unreachable!("non-comparison kind"),
    };
    if pass { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_score_kinds() {
        let good = json!("meow");
        assert_eq!(compare_score(MetricKind::Equals, &json!("meow"), &good), 1.0);
        assert_eq!(compare_score(MetricKind::NotEquals, &json!("meow"), &good), 0.0);
        assert_eq!(
            compare_score(MetricKind::Contains, &json!("a meow b"), &good),
            1.0
        );
        assert_eq!(
            compare_score(MetricKind::NotContains, &json!("a meow b"), &good),
            0.0
        );
        assert_eq!(compare_score(MetricKind::Similar, &good, &good), 1.0);
    }
}
