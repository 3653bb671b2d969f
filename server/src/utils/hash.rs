//! Content hashing for roll-up deduplication
//!
//! Parents remember which children have already been accumulated into their
//! token/cost counters via a sorted set of fixed-width child hashes. The hash
//! is the first 8 bytes of SHA-256 over the child's canonical id + usage
//! JSON, rendered as 16 hex characters.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::data::types::Span;

/// Fixed-width content hash of a child span for the parent `_seen` set
pub fn seen_hash(child: &Span) -> String {
    let canonical = json!({
        "id": child.id,
        "trace": child.trace,
        "input_tokens": child.input_tokens,
        "output_tokens": child.output_tokens,
        "cached_input_tokens": child.cached_input_tokens,
        "total_tokens": child.total_tokens,
        "cost_usd": child.cost_usd,
    });
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(&digest[..8])
}

/// Insert a hash into a sorted `_seen` vector, returning false if present
pub fn seen_insert(seen: &mut Vec<String>, hash: String) -> bool {
    match seen.binary_search(&hash) {
        Ok(_) => false,
        Err(pos) => {
            seen.insert(pos, hash);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, input: Option<i64>) -> Span {
        Span {
            id: id.to_string(),
            input_tokens: input,
            ..Default::default()
        }
    }

    #[test]
    fn test_seen_hash_deterministic() {
        let a = span("b", Some(10));
        let b = span("b", Some(10));
        assert_eq!(seen_hash(&a), seen_hash(&b));
        assert_eq!(seen_hash(&a).len(), 16);
    }

    #[test]
    fn test_seen_hash_differs_by_content() {
        assert_ne!(seen_hash(&span("b", Some(10))), seen_hash(&span("b", Some(11))));
        assert_ne!(seen_hash(&span("b", Some(10))), seen_hash(&span("c", Some(10))));
    }

    #[test]
    fn test_seen_insert_sorted_and_dedups() {
        let mut seen = Vec::new();
        assert!(seen_insert(&mut seen, "bb".into()));
        assert!(seen_insert(&mut seen, "aa".into()));
        assert!(!seen_insert(&mut seen, "bb".into()));
        assert_eq!(seen, vec!["aa".to_string(), "bb".to_string()]);
    }
}
