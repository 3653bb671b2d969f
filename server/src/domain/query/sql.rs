//! SQL WHERE-clause emission
//!
//! Compiles a parsed query tree into a fragment placed after `WHERE` for
//! SQL-backed entities. Column names are validated against a strict
//! identifier pattern; values are single-quoted with quotes doubled.

use std::sync::LazyLock;

use regex::Regex;

use super::parser::{BoolOp, QueryNode};

/// Identifier guard; anything else is rejected
static COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Sentinel emitted for empty trees
const MATCH_ALL: &str = "1=1";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SqlCompileError {
    #[error("Invalid column name: {0}")]
    InvalidColumn(String),
}

/// Compile a query tree to a WHERE fragment
pub fn compile(node: &QueryNode) -> Result<String, SqlCompileError> {
    if node.is_empty() {
        return Ok(MATCH_ALL.to_string());
    }
    emit(node)
}

fn emit(node: &QueryNode) -> Result<String, SqlCompileError> {
    match node {
        QueryNode::Word(word) => Ok(format!("name ILIKE '%{}%'", escape(word))),
        QueryNode::Field { field, value } => emit_field(field, value),
        QueryNode::Op { op, children } => {
            let joiner = match op {
                BoolOp::And => " AND ",
                BoolOp::Or => " OR ",
            };
            let parts: Result<Vec<String>, _> = children.iter().map(emit).collect();
            Ok(format!("({})", parts?.join(joiner)))
        }
    }
}

fn emit_field(field: &str, value: &str) -> Result<String, SqlCompileError> {
    if !COLUMN_RE.is_match(field) {
        return Err(SqlCompileError::InvalidColumn(field.to_string()));
    }

    // Membership arrays are matched element-wise
    if field == "members" {
        return Ok(format!("'{}' = ANY(members)", escape(value)));
    }

    if value == "unset" {
        return Ok(format!("{field} IS NULL"));
    }

    for (prefix, op) in [(">=", ">="), ("<=", "<="), (">", ">"), ("<", "<")] {
        if let Some(rest) = value.strip_prefix(prefix) {
            return Ok(format!("{field} {op} '{}'", escape(rest)));
        }
    }

    Ok(format!("{field} = '{}'", escape(value)))
}

/// Double single quotes so values cannot terminate the literal
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::parser::parse;

    #[test]
    fn test_empty_compiles_to_sentinel() {
        assert_eq!(compile(&parse("")).unwrap(), "1=1");
    }

    #[test]
    fn test_field_equality() {
        assert_eq!(compile(&parse("dataset:d1")).unwrap(), "dataset = 'd1'");
    }

    #[test]
    fn test_bare_word_ilike() {
        assert_eq!(compile(&parse("smoke")).unwrap(), "name ILIKE '%smoke%'");
    }

    #[test]
    fn test_quote_doubling() {
        let node = QueryNode::Field {
            field: "name".into(),
            value: "o'brien".into(),
        };
        assert_eq!(compile(&node).unwrap(), "name = 'o''brien'");
    }

    #[test]
    fn test_injection_rejected() {
        let node = QueryNode::Field {
            field: "name; DROP TABLE users".into(),
            value: "x".into(),
        };
        let err = compile(&node).unwrap_err();
        assert!(err.to_string().contains("Invalid column name"));

        let node = QueryNode::Field {
            field: "na-me".into(),
            value: "x".into(),
        };
        assert!(compile(&node).is_err());
    }

    #[test]
    fn test_members_special_case() {
        assert_eq!(
            compile(&parse("members:user@example.com")).unwrap(),
            "'user@example.com' = ANY(members)"
        );
    }

    #[test]
    fn test_unset_is_null() {
        assert_eq!(compile(&parse("batch:unset")).unwrap(), "batch IS NULL");
    }

    #[test]
    fn test_range_operators() {
        assert_eq!(compile(&parse("created:>=100")).unwrap(), "created >= '100'");
        assert_eq!(compile(&parse("created:<200")).unwrap(), "created < '200'");
    }

    #[test]
    fn test_and_or_grouping() {
        assert_eq!(
            compile(&parse("a:1 b:2")).unwrap(),
            "(a = '1' AND b = '2')"
        );
        assert_eq!(
            compile(&parse("a:1 OR b:2")).unwrap(),
            "(a = '1' OR b = '2')"
        );
        assert_eq!(
            compile(&parse("a:1 (b:2 OR c:3)")).unwrap(),
            "(a = '1' AND (b = '2' OR c = '3'))"
        );
    }

    #[test]
    fn test_quoted_value_cannot_escape() {
        let node = QueryNode::Word("x' OR '1'='1".into());
        assert_eq!(
            compile(&node).unwrap(),
            "name ILIKE '%x'' OR ''1''=''1%'"
        );
    }
}
