//! Parent/child statistics roll-up
//!
//! Every span with usage counters contributes them to its parent, exactly
//! once: the child's content hash is recorded in the parent's sorted
//! `_seen` set before the parent's counters are augmented, so re-ingesting
//! the same batch (or the same late child) is a no-op on the counters.

use std::collections::HashMap;

use crate::data::types::Span;
use crate::utils::hash::{seen_hash, seen_insert};

/// Counter delta carried from a child to its parent
#[derive(Debug, Clone, Copy)]
pub struct UsageDelta {
    pub input: i64,
    pub output: i64,
    pub cached: i64,
    pub total: i64,
    pub cost: f64,
}

/// A child whose parent was not present in the batch; resolved against the
/// store after the bulk insert
#[derive(Debug, Clone)]
pub struct DeferredRollup {
    pub parent_id: String,
    pub child_hash: String,
    pub delta: UsageDelta,
}

fn delta_of(child: &Span) -> UsageDelta {
    UsageDelta {
        input: child.input_tokens.unwrap_or(0),
        output: child.output_tokens.unwrap_or(0),
        cached: child.cached_input_tokens.unwrap_or(0),
        total: child
            .total_tokens
            .unwrap_or(child.input_tokens.unwrap_or(0) + child.output_tokens.unwrap_or(0)),
        cost: child.cost_usd.unwrap_or(0.0),
    }
}

/// Add a `_seen`-guarded delta to a parent. Returns false when the child
/// hash was already recorded (idempotent re-ingest).
pub fn apply_delta(parent: &mut Span, child_hash: String, delta: &UsageDelta) -> bool {
    if !seen_insert(&mut parent.seen, child_hash) {
        return false;
    }

    parent.input_tokens = Some(parent.input_tokens.unwrap_or(0) + delta.input);
    parent.output_tokens = Some(parent.output_tokens.unwrap_or(0) + delta.output);
    if delta.cached != 0 || parent.cached_input_tokens.is_some() {
        parent.cached_input_tokens = Some(parent.cached_input_tokens.unwrap_or(0) + delta.cached);
    }
    parent.total_tokens = Some(parent.total_tokens.unwrap_or(0) + delta.total);
    parent.cost_usd = Some(parent.cost_usd.unwrap_or(0.0) + delta.cost);
    true
}

/// Roll children into parents present in the same batch (before insert).
/// Children whose parents are elsewhere come back as deferred roll-ups.
pub fn rollup_batch(spans: &mut [Span]) -> Vec<DeferredRollup> {
    let index_by_id: HashMap<String, usize> = spans
        .iter()
        .enumerate()
        .map(|(i, span)| (span.id.clone(), i))
        .collect();

    // Collect (child, parent) work before mutating to keep the borrow simple
    let mut in_batch: Vec<(usize, String, UsageDelta)> = Vec::new();
    let mut deferred: Vec<DeferredRollup> = Vec::new();

    for (i, span) in spans.iter().enumerate() {
        if !span.has_usage() {
            continue;
        }
        let Some(parent_id) = &span.parent else {
            continue;
        };

        let hash = seen_hash(span);
        let delta = delta_of(span);

        match index_by_id.get(parent_id) {
            Some(&parent_idx) if parent_idx != i => {
                in_batch.push((parent_idx, hash, delta));
            }
            Some(_) => {} // self-parented span, ignore
            None => deferred.push(DeferredRollup {
                parent_id: parent_id.clone(),
                child_hash: hash,
                delta,
            }),
        }
    }

    for (parent_idx, hash, delta) in in_batch {
        apply_delta(&mut spans[parent_idx], hash, &delta);
    }

    deferred
}
