//! Span document model
//!
//! Spans are stored in the search engine with a flattened `attributes` bag.
//! Oversized attribute values live in `unindexed_attributes` (source-only,
//! not indexed) and are merged back on read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// OTLP span status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One unit of work in a trace, extended with AIQA-specific fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Span {
    /// Span id, hex encoded
    pub id: String,
    /// Owning trace id, hex encoded
    pub trace: String,
    /// Parent span id; None iff this span is a trace root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub organisation: String,
    pub name: String,
    /// OTLP span kind (integer enum)
    pub kind: i32,
    #[serde(default)]
    pub status: SpanStatus,
    /// Start, epoch milliseconds
    pub start: i64,
    /// End, epoch milliseconds
    pub end: i64,
    /// Duration in milliseconds
    pub duration: i64,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    /// Attribute values too large to index; merged into `attributes` on read
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub unindexed_attributes: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<JsonValue>,
    /// Content-derived hash of the span input
    #[serde(rename = "inputHash", default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    /// Hashes of children already rolled into this parent's counters,
    /// kept sorted
    #[serde(rename = "_seen", default, skip_serializing_if = "Vec::is_empty")]
    pub seen: Vec<String>,
    /// Owning experiment, when spawned by a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<String>,
    /// Example this span was captured into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    // Usage counters rolled up from children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

impl Span {
    /// Whether this span carries any usage counters worth rolling up
    pub fn has_usage(&self) -> bool {
        self.input_tokens.is_some()
            || self.output_tokens.is_some()
            || self.cached_input_tokens.is_some()
            || self.total_tokens.is_some()
            || self.cost_usd.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_span_roundtrip_serde() {
        let mut span = Span {
            id: "a".into(),
            trace: "t".into(),
            organisation: "org".into(),
            name: "root".into(),
            start: 1705315800000,
            end: 1705315801000,
            duration: 1000,
            seen: vec!["aabbccdd00112233".into()],
            input_tokens: Some(10),
            ..Default::default()
        };
        span.attributes
            .insert("service.name".into(), json!("svc"));

        let value = serde_json::to_value(&span).unwrap();
        assert_eq!(value["_seen"], json!(["aabbccdd00112233"]));
        assert!(value.get("parent").is_none());

        let back: Span = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, "a");
        assert_eq!(back.input_tokens, Some(10));
        assert!(back.parent.is_none());
    }

    #[test]
    fn test_has_usage() {
        let mut span = Span::default();
        assert!(!span.has_usage());
        span.cost_usd = Some(0.001);
        assert!(span.has_usage());
    }
}
