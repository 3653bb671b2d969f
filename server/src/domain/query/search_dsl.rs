//! Search-engine query emission
//!
//! Compiles a parsed query tree into the search engine's JSON query DSL.

use serde_json::{Value as JsonValue, json};

use super::parser::{BoolOp, QueryNode};
use crate::utils::time::to_ms;

/// Fields whose range values parse as ISO-8601 or milliseconds
const DATE_FIELDS: &[&str] = &["start", "end", "duration", "@timestamp"];

/// Compile a query tree to a search-engine query clause
pub fn compile(node: &QueryNode) -> JsonValue {
    if node.is_empty() {
        return json!({"match_all": {}});
    }
    emit(node)
}

fn emit(node: &QueryNode) -> JsonValue {
    match node {
        QueryNode::Word(word) => json!({
            "query_string": {
                "query": word,
                "default_operator": "AND"
            }
        }),
        QueryNode::Field { field, value } => emit_field(field, value),
        QueryNode::Op { op, children } => {
            let clauses: Vec<JsonValue> = children.iter().map(emit).collect();
            match op {
                BoolOp::And => json!({"bool": {"must": clauses}}),
                BoolOp::Or => json!({
                    "bool": {"should": clauses, "minimum_should_match": 1}
                }),
            }
        }
    }
}

fn emit_field(field: &str, value: &str) -> JsonValue {
    if value == "unset" {
        return json!({"bool": {"must_not": [{"exists": {"field": field}}]}});
    }

    if let Some((op, rest)) = split_range_op(value) {
        return json!({"range": {field: {op: range_value(field, rest)}}});
    }

    // Numeric-looking values use a typed term match
    if let Ok(n) = value.parse::<f64>() {
        let typed = serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(value.to_string()));
        return json!({"term": {field: typed}});
    }

    // Strings: exact term, exact keyword term, and a text match
    json!({
        "bool": {
            "should": [
                {"term": {field: {"value": value}}},
                {"term": {format!("{field}.keyword"): {"value": value}}},
                {"match": {field: value}}
            ],
            "minimum_should_match": 1
        }
    })
}

fn split_range_op(value: &str) -> Option<(&'static str, &str)> {
    if let Some(rest) = value.strip_prefix(">=") {
        Some(("gte", rest))
    } else if let Some(rest) = value.strip_prefix("<=") {
        Some(("lte", rest))
    } else if let Some(rest) = value.strip_prefix('>') {
        Some(("gt", rest))
    } else if let Some(rest) = value.strip_prefix('<') {
        Some(("lt", rest))
    } else {
        None
    }
}

fn range_value(field: &str, raw: &str) -> JsonValue {
    if DATE_FIELDS.contains(&field) {
        // ISO-8601 or a number of milliseconds
        if let Some(ms) = to_ms(&JsonValue::String(raw.to_string())) {
            return json!(ms);
        }
    }
    if let Ok(n) = raw.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return JsonValue::Number(num);
        }
    }
    JsonValue::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::parser::parse;
    use serde_json::json;

    #[test]
    fn test_empty_compiles_to_match_all() {
        assert_eq!(compile(&parse("")), json!({"match_all": {}}));
    }

    #[test]
    fn test_bare_word_query_string() {
        assert_eq!(
            compile(&parse("timeout")),
            json!({"query_string": {"query": "timeout", "default_operator": "AND"}})
        );
    }

    #[test]
    fn test_numeric_field_term() {
        assert_eq!(compile(&parse("kind:2")), json!({"term": {"kind": 2.0}}));
    }

    #[test]
    fn test_string_field_disjunction() {
        let compiled = compile(&parse("name:root"));
        let should = &compiled["bool"]["should"];
        assert_eq!(should.as_array().unwrap().len(), 3);
        assert_eq!(should[0], json!({"term": {"name": {"value": "root"}}}));
        assert_eq!(should[1], json!({"term": {"name.keyword": {"value": "root"}}}));
        assert_eq!(should[2], json!({"match": {"name": "root"}}));
        assert_eq!(compiled["bool"]["minimum_should_match"], json!(1));
    }

    #[test]
    fn test_unset_negated_existence() {
        assert_eq!(
            compile(&parse("parent:unset")),
            json!({"bool": {"must_not": [{"exists": {"field": "parent"}}]}})
        );
    }

    #[test]
    fn test_range_operators() {
        assert_eq!(
            compile(&parse("duration:>=100")),
            json!({"range": {"duration": {"gte": 100.0}}})
        );
        assert_eq!(
            compile(&parse("count:<5")),
            json!({"range": {"count": {"lt": 5.0}}})
        );
    }

    #[test]
    fn test_date_range_iso_parses_to_ms() {
        assert_eq!(
            compile(&parse("start:>=2024-01-15T10:30:00.000Z")),
            json!({"range": {"start": {"gte": 1705314600000_i64}}})
        );
    }

    #[test]
    fn test_and_emits_must() {
        let compiled = compile(&parse("a:1 b:2"));
        assert_eq!(compiled["bool"]["must"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_or_emits_should_with_minimum() {
        let compiled = compile(&parse("a:1 OR b:2"));
        assert_eq!(compiled["bool"]["should"].as_array().unwrap().len(), 2);
        assert_eq!(compiled["bool"]["minimum_should_match"], json!(1));
        assert_eq!(compiled["bool"]["should"][0], json!({"term": {"a": 1.0}}));
        assert_eq!(compiled["bool"]["should"][1], json!({"term": {"b": 2.0}}));
    }
}
