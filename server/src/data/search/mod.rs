//! Span store adapter
//!
//! Wraps the search engine with two logical indices (spans, examples)
//! addressed through aliases so that schema migrations can create a
//! `_vN+1` index, reindex, and flip the alias atomically.

mod client;
mod error;
mod examples;
mod indices;
mod spans;

pub use error::SearchError;
pub use spans::GuardedSpan;

use reqwest::Method;
use serde_json::{Value as JsonValue, json};

use crate::core::config::StoreConfig;
use crate::domain::query::{QueryNode, search_dsl};

use client::EsClient;

/// High-level adapter over the search engine
pub struct SearchService {
    client: EsClient,
}

impl SearchService {
    pub async fn init(config: &StoreConfig) -> Result<Self, SearchError> {
        let client = EsClient::new(&config.elasticsearch_url)?;

        // Validate connectivity early so startup fails loudly
        client.request(Method::GET, "", None).await?;
        tracing::debug!(url = %config.elasticsearch_url, "Search engine connected");

        Ok(Self { client })
    }

    /// Bootstrap the aliases and their `_v1` indices when missing
    pub async fn ensure_indices(&self) -> Result<(), SearchError> {
        indices::ensure_indices(&self.client).await
    }

    /// Administrative index deletion; never called from request paths
    pub async fn delete_index(&self, name: &str) -> Result<(), SearchError> {
        indices::delete_index(&self.client, name).await
    }

    /// Migrate an alias to the next index version (create `_vN+1`,
    /// reindex, flip). Administrative; predecessor cleanup is left to
    /// operators.
    pub async fn migrate_index(&self, alias: &str) -> Result<String, SearchError> {
        indices::migrate(&self.client, alias).await
    }

    /// The reqwest client has no explicit teardown; connections close on drop
    pub fn close(&self) {}

    pub(crate) fn client(&self) -> &EsClient {
        &self.client
    }

    pub(crate) async fn bulk(&self, ndjson: String) -> Result<JsonValue, SearchError> {
        self.client.bulk(ndjson).await
    }

    /// Build a search body: compiled query AND tenant filter (+ extra terms),
    /// paging, sort, and source filtering. When `attributes` is included or
    /// excluded, `unindexed_attributes` follows it automatically.
    fn search_body(
        query: &QueryNode,
        org_id: &str,
        extra_terms: &[(&str, &str)],
        sort_field: &str,
        limit: usize,
        offset: usize,
        includes: Option<&[String]>,
        excludes: Option<&[String]>,
    ) -> JsonValue {
        let mut must = vec![search_dsl::compile(query), json!({"term": {"organisation": org_id}})];
        for (field, value) in extra_terms {
            must.push(json!({"term": {*field: *value}}));
        }

        let mut body = json!({
            "query": {"bool": {"must": must}},
            "from": offset,
            "size": limit,
            "sort": [{sort_field: "desc"}]
        });

        let mut source = serde_json::Map::new();
        if let Some(includes) = includes {
            source.insert(
                "includes".into(),
                json!(couple_unindexed(includes)),
            );
        }
        if let Some(excludes) = excludes {
            source.insert(
                "excludes".into(),
                json!(couple_unindexed(excludes)),
            );
        }
        if !source.is_empty() {
            body["_source"] = JsonValue::Object(source);
        }

        body
    }

    /// Extract `_source` documents from a search response
    fn hits(response: &JsonValue) -> Vec<JsonValue> {
        response["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit.get("_source").cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `attributes` in a field list drags `unindexed_attributes` along with it
fn couple_unindexed(fields: &[String]) -> Vec<String> {
    let mut coupled: Vec<String> = fields.to_vec();
    if fields.iter().any(|f| f == "attributes" || f.starts_with("attributes."))
        && !coupled.iter().any(|f| f == "unindexed_attributes")
    {
        coupled.push("unindexed_attributes".to_string());
    }
    coupled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::parse;

    #[test]
    fn test_couple_unindexed() {
        let coupled = couple_unindexed(&["attributes".to_string(), "name".to_string()]);
        assert!(coupled.contains(&"unindexed_attributes".to_string()));

        let untouched = couple_unindexed(&["name".to_string()]);
        assert!(!untouched.contains(&"unindexed_attributes".to_string()));
    }

    #[test]
    fn test_search_body_shape() {
        let body = SearchService::search_body(
            &parse("id:a"),
            "org1",
            &[("example", "e1")],
            "start",
            50,
            10,
            None,
            None,
        );
        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 3);
        assert_eq!(must[1], json!({"term": {"organisation": "org1"}}));
        assert_eq!(must[2], json!({"term": {"example": "e1"}}));
        assert_eq!(body["from"], json!(10));
        assert_eq!(body["size"], json!(50));
        assert_eq!(body["sort"][0]["start"], json!("desc"));
        assert!(body.get("_source").is_none());
    }

    #[test]
    fn test_search_body_source_filtering() {
        let includes = vec!["attributes".to_string()];
        let body = SearchService::search_body(
            &parse(""),
            "org1",
            &[],
            "created",
            10,
            0,
            Some(&includes),
            None,
        );
        let included = body["_source"]["includes"].as_array().unwrap();
        assert!(included.contains(&json!("unindexed_attributes")));
    }
}
