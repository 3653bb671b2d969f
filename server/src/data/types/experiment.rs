//! Experiment model: results and running summaries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    #[default]
    Open,
    Closed,
}

impl ExperimentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "closed" => Self::Closed,
            _ => Self::Open,
        }
    }
}

/// Online mean/variance/min/max/count for one metric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample variance (n−1 denominator)
    pub var: f64,
    pub count: u64,
}

/// Per-example outcome of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentResult {
    #[serde(rename = "exampleId")]
    pub example_id: String,
    #[serde(rename = "traceId", default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Metric name → score
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Per-metric informational messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<BTreeMap<String, String>>,
    /// Per-metric failures; their metrics carry no score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(
        rename = "rateLimited",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limited: Option<bool>,
}

/// One run of a dataset through user code with a particular parameter set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub dataset: String,
    pub organisation: String,
    /// Links sibling experiments created by one comparison run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
    #[serde(default)]
    pub status: ExperimentStatus,
    /// Metric name → running statistics
    #[serde(default)]
    pub summaries: BTreeMap<String, SummaryStats>,
    #[serde(default)]
    pub results: Vec<ExperimentResult>,
    /// Trace ids spawned by the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<String>,
    pub created: i64,
    pub updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_serde_field_names() {
        let result = ExperimentResult {
            example_id: "e1".into(),
            trace_id: Some("t1".into()),
            scores: BTreeMap::from([("cost".into(), 0.002)]),
            ..Default::default()
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["exampleId"], json!("e1"));
        assert_eq!(value["traceId"], json!("t1"));
        assert_eq!(value["scores"]["cost"], json!(0.002));
    }

    #[test]
    fn test_experiment_defaults() {
        let exp: Experiment = serde_json::from_value(json!({
            "id": "x",
            "dataset": "d",
            "organisation": "o",
            "name": "run-1",
            "created": 0,
            "updated": 0
        }))
        .unwrap();
        assert_eq!(exp.status, ExperimentStatus::Open);
        assert!(exp.summaries.is_empty());
        assert!(exp.results.is_empty());
    }
}
