//! OTLP flattening and attribute normalisation
//!
//! Materialises a `Span` per ResourceSpans × ScopeSpans × Span in document
//! order, merging resource attributes into span attributes, normalising
//! times to epoch milliseconds, JSON-parsing stringy attribute values,
//! wrapping primitive input/output for the flattened index, and spilling
//! oversized values to `unindexed_attributes`.

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use serde_json::{Map, Value as JsonValue, json};

use crate::core::constants::{
    ATTR_CACHED_INPUT_TOKENS, ATTR_COST_USD, ATTR_INPUT_TOKENS, ATTR_OUTPUT_TOKENS,
    ATTR_TOTAL_TOKENS, UNINDEXED_VALUE_THRESHOLD,
};
use crate::data::types::{Span, SpanStatus};
use crate::utils::crypto::sha256_hex;
use crate::utils::json::{parse_if_json, wrap_primitive};
use crate::utils::time::to_ms;

/// Flatten an OTLP export request into normalised spans for one tenant
pub fn normalize_request(request: &ExportTraceServiceRequest, org_id: &str) -> Vec<Span> {
    let mut spans = Vec::new();

    for resource_spans in &request.resource_spans {
        let resource_attrs = resource_spans
            .resource
            .as_ref()
            .map(|r| attributes_to_map(&r.attributes))
            .unwrap_or_default();

        for scope_spans in &resource_spans.scope_spans {
            for span in &scope_spans.spans {
                spans.push(normalize_span(span, &resource_attrs, org_id));
            }
        }
    }

    spans
}

fn normalize_span(
    span: &opentelemetry_proto::tonic::trace::v1::Span,
    resource_attrs: &Map<String, JsonValue>,
    org_id: &str,
) -> Span {
    // Resource attributes first so span attributes win on collision
    let mut attributes = resource_attrs.clone();
    for (key, value) in attributes_to_map(&span.attributes) {
        attributes.insert(key, value);
    }
    normalize_attributes(&mut attributes);

    let start = to_ms(&json!(span.start_time_unix_nano)).unwrap_or(0);
    let end = to_ms(&json!(span.end_time_unix_nano)).unwrap_or(start);

    let usage = extract_usage(&attributes);
    let input_hash = attributes
        .get("input")
        .map(|input| sha256_hex(&input.to_string()));

    let (attributes, unindexed_attributes) = spill_oversized(attributes);

    let parent = if span.parent_span_id.is_empty() {
        None
    } else {
        Some(hex::encode(&span.parent_span_id))
    };

    Span {
        id: hex::encode(&span.span_id),
        trace: hex::encode(&span.trace_id),
        parent,
        organisation: org_id.to_string(),
        name: span.name.clone(),
        kind: span.kind,
        status: span
            .status
            .as_ref()
            .map(|s| SpanStatus {
                code: s.code,
                message: (!s.message.is_empty()).then(|| s.message.clone()),
            })
            .unwrap_or_default(),
        start,
        end,
        duration: end - start,
        attributes,
        unindexed_attributes,
        input_hash,
        input_tokens: usage.input,
        output_tokens: usage.output,
        cached_input_tokens: usage.cached,
        total_tokens: usage.total,
        cost_usd: usage.cost,
        ..Default::default()
    }
}

/// JSON-parse string values that look like serialised JSON; wrap primitive
/// input/output so the flattened index accepts them
fn normalize_attributes(attributes: &mut Map<String, JsonValue>) {
    let keys: Vec<String> = attributes.keys().cloned().collect();
    for key in keys {
        let Some(value) = attributes.remove(&key) else {
            continue;
        };
        let mut value = parse_if_json(value);
        if key == "input" || key == "output" {
            value = wrap_primitive(value);
        }
        attributes.insert(key, value);
    }
}

/// Move values whose serialised size exceeds the threshold into the
/// unindexed subtree
fn spill_oversized(
    attributes: Map<String, JsonValue>,
) -> (Map<String, JsonValue>, Map<String, JsonValue>) {
    let mut indexed = Map::new();
    let mut unindexed = Map::new();

    for (key, value) in attributes {
        let size = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
        if size > UNINDEXED_VALUE_THRESHOLD {
            unindexed.insert(key, value);
        } else {
            indexed.insert(key, value);
        }
    }

    (indexed, unindexed)
}

/// Usage counters pulled out of the attribute bag
#[derive(Debug, Default, Clone, Copy)]
pub struct Usage {
    pub input: Option<i64>,
    pub output: Option<i64>,
    pub cached: Option<i64>,
    pub total: Option<i64>,
    pub cost: Option<f64>,
}

fn extract_usage(attributes: &Map<String, JsonValue>) -> Usage {
    let int = |key: &str| attributes.get(key).and_then(as_i64);
    let input = int(ATTR_INPUT_TOKENS);
    let output = int(ATTR_OUTPUT_TOKENS);
    let cached = int(ATTR_CACHED_INPUT_TOKENS);
    // Total defaults to input + output when the attribute is absent
    let total = int(ATTR_TOTAL_TOKENS).or(match (input, output) {
        (None, None) => None,
        (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
    });
    let cost = attributes.get(ATTR_COST_USD).and_then(as_f64);

    Usage {
        input,
        output,
        cached,
        total,
        cost,
    }
}

fn as_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn attributes_to_map(attrs: &[KeyValue]) -> Map<String, JsonValue> {
    attrs
        .iter()
        .filter_map(|kv| {
            kv.value
                .as_ref()
                .map(|v| (kv.key.clone(), any_value_to_json(v)))
        })
        .collect()
}

/// Convert an OTLP AnyValue into typed JSON
pub fn any_value_to_json(value: &AnyValue) -> JsonValue {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => json!(s),
        Some(any_value::Value::BoolValue(b)) => json!(b),
        Some(any_value::Value::IntValue(i)) => json!(i),
        Some(any_value::Value::DoubleValue(d)) => json!(d),
        Some(any_value::Value::ArrayValue(arr)) => {
            JsonValue::Array(arr.values.iter().map(any_value_to_json).collect())
        }
        Some(any_value::Value::KvlistValue(kvlist)) => {
            let map: Map<String, JsonValue> = kvlist
                .values
                .iter()
                .filter_map(|kv| {
                    kv.value
                        .as_ref()
                        .map(|v| (kv.key.clone(), any_value_to_json(v)))
                })
                .collect();
            JsonValue::Object(map)
        }
        Some(any_value::Value::BytesValue(b)) => json!(hex::encode(b)),
        None => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::KeyValue;
    use opentelemetry_proto::tonic::resource::v1::Resource;
    use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Status};

    fn attr(key: &str, value: any_value::Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue { value: Some(value) }),
        }
    }

    fn proto_span(
        id: &[u8],
        parent: &[u8],
        attrs: Vec<KeyValue>,
    ) -> opentelemetry_proto::tonic::trace::v1::Span {
        opentelemetry_proto::tonic::trace::v1::Span {
            trace_id: vec![0xaa; 16],
            span_id: id.to_vec(),
            parent_span_id: parent.to_vec(),
            name: "op".to_string(),
            kind: 1,
            start_time_unix_nano: 1_705_315_800_000_000_000,
            end_time_unix_nano: 1_705_315_801_000_000_000,
            attributes: attrs,
            status: Some(Status {
                code: 1,
                message: String::new(),
            }),
            ..Default::default()
        }
    }

    fn request(spans: Vec<opentelemetry_proto::tonic::trace::v1::Span>) -> ExportTraceServiceRequest {
        ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: Some(Resource {
                    attributes: vec![attr(
                        "service.name",
                        any_value::Value::StringValue("svc".into()),
                    )],
                    dropped_attributes_count: 0,
                }),
                scope_spans: vec![ScopeSpans {
                    scope: None,
                    spans,
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            }],
        }
    }

    #[test]
    fn test_normalize_flattens_and_merges_resource_attrs() {
        let spans = normalize_request(&request(vec![proto_span(&[1; 8], &[], vec![])]), "org1");
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.organisation, "org1");
        assert_eq!(span.attributes["service.name"], json!("svc"));
        assert_eq!(span.start, 1_705_315_800_000);
        assert_eq!(span.duration, 1000);
        assert!(span.parent.is_none());
    }

    #[test]
    fn test_normalize_span_attr_wins_over_resource() {
        let spans = normalize_request(
            &request(vec![proto_span(
                &[1; 8],
                &[],
                vec![attr(
                    "service.name",
                    any_value::Value::StringValue("override".into()),
                )],
            )]),
            "org1",
        );
        assert_eq!(spans[0].attributes["service.name"], json!("override"));
    }

    #[test]
    fn test_normalize_parent_and_usage() {
        let spans = normalize_request(
            &request(vec![proto_span(
                &[2; 8],
                &[1; 8],
                vec![
                    attr(ATTR_INPUT_TOKENS, any_value::Value::IntValue(10)),
                    attr(ATTR_OUTPUT_TOKENS, any_value::Value::IntValue(5)),
                    attr(ATTR_COST_USD, any_value::Value::DoubleValue(0.001)),
                ],
            )]),
            "org1",
        );
        let span = &spans[0];
        assert_eq!(span.parent.as_deref(), Some("0101010101010101"));
        assert_eq!(span.input_tokens, Some(10));
        assert_eq!(span.output_tokens, Some(5));
        assert_eq!(span.total_tokens, Some(15));
        assert_eq!(span.cost_usd, Some(0.001));
    }

    #[test]
    fn test_normalize_parses_json_strings_and_wraps_io() {
        let spans = normalize_request(
            &request(vec![proto_span(
                &[3; 8],
                &[],
                vec![
                    attr(
                        "payload",
                        any_value::Value::StringValue("{\"a\": 1}".into()),
                    ),
                    attr("input", any_value::Value::StringValue("hello".into())),
                ],
            )]),
            "org1",
        );
        let span = &spans[0];
        assert_eq!(span.attributes["payload"], json!({"a": 1}));
        assert_eq!(span.attributes["input"], json!({"value": "hello"}));
        assert!(span.input_hash.is_some());
    }

    #[test]
    fn test_oversized_value_spills_to_unindexed() {
        let big = "x".repeat(UNINDEXED_VALUE_THRESHOLD + 1);
        let spans = normalize_request(
            &request(vec![proto_span(
                &[4; 8],
                &[],
                vec![attr("blob", any_value::Value::StringValue(big.clone()))],
            )]),
            "org1",
        );
        let span = &spans[0];
        assert!(!span.attributes.contains_key("blob"));
        assert_eq!(span.unindexed_attributes["blob"], json!(big));
    }

    #[test]
    fn test_total_tokens_attribute_wins() {
        let spans = normalize_request(
            &request(vec![proto_span(
                &[5; 8],
                &[],
                vec![
                    attr(ATTR_INPUT_TOKENS, any_value::Value::IntValue(10)),
                    attr(ATTR_TOTAL_TOKENS, any_value::Value::IntValue(99)),
                ],
            )]),
            "org1",
        );
        assert_eq!(spans[0].total_tokens, Some(99));
    }

    #[test]
    fn test_any_value_to_json_nested() {
        use opentelemetry_proto::tonic::common::v1::ArrayValue;
        let value = AnyValue {
            value: Some(any_value::Value::ArrayValue(ArrayValue {
                values: vec![
                    AnyValue {
                        value: Some(any_value::Value::IntValue(1)),
                    },
                    AnyValue {
                        value: Some(any_value::Value::StringValue("two".into())),
                    },
                ],
            })),
        };
        assert_eq!(any_value_to_json(&value), json!([1, "two"]));
    }
}
