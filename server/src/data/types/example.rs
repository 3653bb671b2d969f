//! Example (eval case) model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::dataset::Metric;

/// Span stripped down for replay: id, name, attributes, parent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExampleSpan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Reference outputs used by comparison metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExampleOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad: Option<JsonValue>,
}

/// One test case in a dataset: either a direct input value or a set of
/// spans to replay. At most one example exists per (trace, dataset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub dataset: String,
    pub organisation: String,
    /// Trace this example was captured from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<JsonValue>,
    /// Captured spans; each must carry an `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<ExampleSpan>>,
    /// Direct input value (alternative to `spans`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ExampleOutputs>,
    /// Example-specific metrics, scored in addition to the dataset's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<Metric>>,
    pub created: i64,
    pub updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_example_serde_optional_fields() {
        let example = Example {
            id: "e1".into(),
            dataset: "d1".into(),
            organisation: "o1".into(),
            input: Some(json!("what is 2+2?")),
            ..Default::default()
        };
        let value = serde_json::to_value(&example).unwrap();
        assert!(value.get("spans").is_none());
        assert!(value.get("trace").is_none());

        let back: Example = serde_json::from_value(value).unwrap();
        assert_eq!(back.input, Some(json!("what is 2+2?")));
    }

    #[test]
    fn test_example_with_spans() {
        let json = json!({
            "id": "e2",
            "dataset": "d1",
            "organisation": "o1",
            "trace": "t1",
            "spans": [{"id": "a", "name": "root", "attributes": {"k": 1}}],
            "created": 0,
            "updated": 0
        });
        let example: Example = serde_json::from_value(json).unwrap();
        let spans = example.spans.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].id, "a");
        assert!(spans[0].parent.is_none());
    }
}
