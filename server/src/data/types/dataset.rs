//! Dataset and metric definitions

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Scoring dimension kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Javascript,
    Llm,
    Number,
    Contains,
    Equals,
    NotContains,
    NotEquals,
    Similar,
    System,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Llm => "llm",
            Self::Number => "number",
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::NotContains => "not_contains",
            Self::NotEquals => "not_equals",
            Self::Similar => "similar",
            Self::System => "system",
        }
    }

    /// Whether the server computes this metric (vs. passing through a
    /// client-supplied score)
    pub fn is_computed(&self) -> bool {
        !matches!(self, Self::Number | Self::System)
    }
}

/// One scoring dimension attached to a dataset (or a single example)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub kind: MetricKind,
    /// Provider reference for llm-kind metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model reference for llm-kind metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Judge prompt for llm-kind metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Criteria substituted into the standard judge template
    #[serde(
        rename = "promptCriteria",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_criteria: Option<String>,
    /// Script body for javascript-kind metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Free-form parameter mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<JsonValue>,
}

/// Named collection of examples plus the metrics used to score them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub organisation: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        rename = "inputSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<JsonValue>,
    #[serde(
        rename = "outputSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_schema: Option<JsonValue>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    pub created: i64,
    pub updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kind_serde_names() {
        assert_eq!(
            serde_json::to_value(MetricKind::NotContains).unwrap(),
            serde_json::json!("not_contains")
        );
        let kind: MetricKind = serde_json::from_value(serde_json::json!("llm")).unwrap();
        assert_eq!(kind, MetricKind::Llm);
    }

    #[test]
    fn test_is_computed() {
        assert!(!MetricKind::Number.is_computed());
        assert!(!MetricKind::System.is_computed());
        assert!(MetricKind::Javascript.is_computed());
        assert!(MetricKind::Llm.is_computed());
        assert!(MetricKind::Contains.is_computed());
    }
}
