//! JSON helpers shared by the normaliser and the span store
//!
//! The search engine indexes `attributes` as a flattened field and refuses
//! bare scalars under it; primitive input/output values are wrapped as
//! `{value: x}` on write and unwrapped on read.

use serde_json::{Map, Value as JsonValue};

/// Whether a string looks like serialised JSON (object or array)
pub fn looks_like_json(s: &str) -> bool {
    matches!(s.trim_start().as_bytes().first(), Some(b'{') | Some(b'['))
}

/// Parse a JSON-looking string; parse failure keeps the raw string
pub fn parse_if_json(value: JsonValue) -> JsonValue {
    if let JsonValue::String(s) = &value
        && looks_like_json(s)
        && let Ok(parsed) = serde_json::from_str::<JsonValue>(s)
    {
        return parsed;
    }
    value
}

/// Wrap a primitive as `{value: x}`; objects and arrays pass through
pub fn wrap_primitive(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(_) | JsonValue::Array(_) => value,
        primitive => {
            let mut map = Map::with_capacity(1);
            map.insert("value".to_string(), primitive);
            JsonValue::Object(map)
        }
    }
}

/// Unwrap a single-key `{value: x}` wrapper; everything else passes through
pub fn unwrap_value(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) if map.len() == 1 && map.contains_key("value") => {
            map.into_iter().next().map(|(_, v)| v).unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json("{\"a\":1}"));
        assert!(looks_like_json("[1,2]"));
        assert!(looks_like_json("  {\"a\":1}"));
        assert!(!looks_like_json("plain text"));
        assert!(!looks_like_json("42"));
    }

    #[test]
    fn test_parse_if_json() {
        assert_eq!(parse_if_json(json!("{\"a\":1}")), json!({"a":1}));
        assert_eq!(parse_if_json(json!("[1,2]")), json!([1, 2]));
        // Parse failure keeps the raw string
        assert_eq!(parse_if_json(json!("{not json")), json!("{not json"));
        assert_eq!(parse_if_json(json!(42)), json!(42));
    }

    #[test]
    fn test_wrap_primitive() {
        assert_eq!(wrap_primitive(json!("hi")), json!({"value": "hi"}));
        assert_eq!(wrap_primitive(json!(3.5)), json!({"value": 3.5}));
        assert_eq!(wrap_primitive(json!(true)), json!({"value": true}));
        assert_eq!(wrap_primitive(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(wrap_primitive(json!([1])), json!([1]));
    }

    #[test]
    fn test_unwrap_value() {
        assert_eq!(unwrap_value(json!({"value": "hi"})), json!("hi"));
        // Multi-key objects are not wrappers
        assert_eq!(
            unwrap_value(json!({"value": 1, "other": 2})),
            json!({"value": 1, "other": 2})
        );
        assert_eq!(unwrap_value(json!("hi")), json!("hi"));
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let primitive = json!(7);
        assert_eq!(unwrap_value(wrap_primitive(primitive.clone())), primitive);
    }
}
