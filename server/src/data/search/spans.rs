//! Span index operations

use reqwest::Method;
use serde_json::{Value as JsonValue, json};

use super::{SearchError, SearchService};
use crate::core::constants::SPAN_INDEX_ALIAS;
use crate::data::types::Span;
use crate::domain::query::QueryNode;
use crate::utils::json::{parse_if_json, unwrap_value};

/// A span read back for an optimistic update
pub struct GuardedSpan {
    pub span: Span,
    pub seq_no: i64,
    pub primary_term: i64,
}

impl SearchService {
    /// Bulk-insert spans; document id = span id
    pub async fn bulk_insert_spans(&self, spans: &[Span]) -> Result<(), SearchError> {
        if spans.is_empty() {
            return Ok(());
        }

        let mut ndjson = String::new();
        for span in spans {
            let action = json!({"index": {"_index": SPAN_INDEX_ALIAS, "_id": span.id}});
            let doc = serde_json::to_string(span)
                .map_err(|e| SearchError::Decode(e.to_string()))?;
            ndjson.push_str(&action.to_string());
            ndjson.push('\n');
            ndjson.push_str(&doc);
            ndjson.push('\n');
        }

        self.bulk(ndjson).await?;
        tracing::trace!(count = spans.len(), "Spans bulk-inserted");
        Ok(())
    }

    /// Read a span by id, scoped to the organisation, together with its
    /// concurrency-control tokens for a guarded write-back
    pub async fn get_span_for_update(
        &self,
        id: &str,
        org_id: &str,
    ) -> Result<Option<GuardedSpan>, SearchError> {
        let response = match self
            .client()
            .request(
                Method::GET,
                &format!("{SPAN_INDEX_ALIAS}/_doc/{id}"),
                None,
            )
            .await
        {
            Ok(r) => r,
            Err(SearchError::Request { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if response.get("found").and_then(JsonValue::as_bool) != Some(true) {
            return Ok(None);
        }

        let source = response
            .get("_source")
            .cloned()
            .ok_or_else(|| SearchError::Decode("document without _source".into()))?;
        let span: Span = serde_json::from_value(source)
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        if span.organisation != org_id {
            return Ok(None);
        }

        Ok(Some(GuardedSpan {
            span,
            seq_no: response["_seq_no"].as_i64().unwrap_or(0),
            primary_term: response["_primary_term"].as_i64().unwrap_or(0),
        }))
    }

    /// Write back a span under optimistic concurrency control.
    /// Returns `SearchError::Conflict` when another writer won.
    pub async fn update_span_guarded(
        &self,
        guarded: &GuardedSpan,
    ) -> Result<(), SearchError> {
        let doc = serde_json::to_value(&guarded.span)
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        self.client()
            .request(
                Method::POST,
                &format!(
                    "{SPAN_INDEX_ALIAS}/_update/{}?if_seq_no={}&if_primary_term={}",
                    guarded.span.id, guarded.seq_no, guarded.primary_term
                ),
                Some(&json!({"doc": doc})),
            )
            .await?;
        Ok(())
    }

    /// Partial merge onto a span; must match the organisation.
    /// Returns false when the span is absent or owned by another tenant.
    pub async fn update_span(
        &self,
        id: &str,
        patch: &JsonValue,
        org_id: &str,
    ) -> Result<bool, SearchError> {
        let Some(_existing) = self.get_span_for_update(id, org_id).await? else {
            return Ok(false);
        };

        self.client()
            .request(
                Method::POST,
                &format!("{SPAN_INDEX_ALIAS}/_update/{id}"),
                Some(&json!({"doc": patch})),
            )
            .await?;
        Ok(true)
    }

    /// Search spans via the query compiler, scoped to the organisation.
    /// Default sort is `start` descending.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_spans(
        &self,
        query: &QueryNode,
        org_id: &str,
        limit: usize,
        offset: usize,
        field_includes: Option<&[String]>,
        field_excludes: Option<&[String]>,
    ) -> Result<Vec<Span>, SearchError> {
        let body = Self::search_body(
            query,
            org_id,
            &[],
            "start",
            limit,
            offset,
            field_includes,
            field_excludes,
        );
        let response = self
            .client()
            .request(
                Method::POST,
                &format!("{SPAN_INDEX_ALIAS}/_search"),
                Some(&body),
            )
            .await?;

        Self::hits(&response)
            .into_iter()
            .map(|source| {
                serde_json::from_value::<Span>(source)
                    .map(finalize_span_read)
                    .map_err(|e| SearchError::Decode(e.to_string()))
            })
            .collect()
    }
}

/// Merge `unindexed_attributes` back into `attributes` (unindexed wins),
/// JSON-parse stringy input/output, unwrap `{value: …}` wrappers.
pub fn finalize_span_read(mut span: Span) -> Span {
    let unindexed = std::mem::take(&mut span.unindexed_attributes);
    for (key, value) in unindexed {
        span.attributes.insert(key, value);
    }

    for key in ["input", "output"] {
        if let Some(value) = span.attributes.remove(key) {
            let value = unwrap_value(parse_if_json(value));
            span.attributes.insert(key.to_string(), value);
        }
    }

    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finalize_merges_unindexed_with_precedence() {
        let mut span = Span::default();
        span.attributes.insert("a".into(), json!(1));
        span.attributes.insert("b".into(), json!("indexed"));
        span.unindexed_attributes
            .insert("b".into(), json!("unindexed"));
        span.unindexed_attributes.insert("c".into(), json!(3));

        let span = finalize_span_read(span);
        assert_eq!(span.attributes["a"], json!(1));
        assert_eq!(span.attributes["b"], json!("unindexed"));
        assert_eq!(span.attributes["c"], json!(3));
        assert!(span.unindexed_attributes.is_empty());
    }

    #[test]
    fn test_finalize_parses_stringy_input_output() {
        let mut span = Span::default();
        span.attributes
            .insert("input".into(), json!("{\"q\": \"hello\"}"));
        span.attributes.insert("output".into(), json!("plain"));

        let span = finalize_span_read(span);
        assert_eq!(span.attributes["input"], json!({"q": "hello"}));
        assert_eq!(span.attributes["output"], json!("plain"));
    }

    #[test]
    fn test_finalize_unwraps_value_wrapper() {
        let mut span = Span::default();
        span.attributes.insert("input".into(), json!({"value": 42}));

        let span = finalize_span_read(span);
        assert_eq!(span.attributes["input"], json!(42));
    }
}
