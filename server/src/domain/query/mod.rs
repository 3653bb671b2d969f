//! Search-query compiler
//!
//! A small field:value search language parsed to a tree and compiled either
//! to the search engine's JSON DSL (indexed trace/example data) or to a
//! parameter-escaped relational WHERE clause (SQL-backed entities).

pub mod parser;
pub mod search_dsl;
pub mod sql;

pub use parser::{BoolOp, QueryNode, parse};
pub use sql::SqlCompileError;
