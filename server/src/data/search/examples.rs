//! Example index operations

use reqwest::Method;
use serde_json::{Value as JsonValue, json};

use super::{SearchError, SearchService};
use crate::core::constants::EXAMPLE_INDEX_ALIAS;
use crate::data::types::Example;
use crate::domain::query::QueryNode;

impl SearchService {
    /// Bulk-insert examples; document id = example id.
    /// (trace, dataset) uniqueness is enforced by the caller before insert.
    pub async fn bulk_insert_examples(&self, examples: &[Example]) -> Result<(), SearchError> {
        if examples.is_empty() {
            return Ok(());
        }

        let mut ndjson = String::new();
        for example in examples {
            let action = json!({"index": {"_index": EXAMPLE_INDEX_ALIAS, "_id": example.id}});
            let doc = serde_json::to_string(example)
                .map_err(|e| SearchError::Decode(e.to_string()))?;
            ndjson.push_str(&action.to_string());
            ndjson.push('\n');
            ndjson.push_str(&doc);
            ndjson.push('\n');
        }

        self.bulk(ndjson).await?;
        Ok(())
    }

    /// Search examples, scoped to the organisation and optionally a dataset.
    /// Default sort is `created` descending.
    pub async fn search_examples(
        &self,
        query: &QueryNode,
        org_id: &str,
        dataset: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Example>, SearchError> {
        let extra: Vec<(&str, &str)> = dataset.map(|d| ("dataset", d)).into_iter().collect();
        let body = Self::search_body(query, org_id, &extra, "created", limit, offset, None, None);
        let response = self
            .client()
            .request(
                Method::POST,
                &format!("{EXAMPLE_INDEX_ALIAS}/_search"),
                Some(&body),
            )
            .await?;

        Self::hits(&response)
            .into_iter()
            .map(|source| {
                serde_json::from_value(source).map_err(|e| SearchError::Decode(e.to_string()))
            })
            .collect()
    }

    /// Fetch one example by id within a dataset, scoped to the organisation
    pub async fn get_example(
        &self,
        id: &str,
        dataset: &str,
        org_id: &str,
    ) -> Result<Option<Example>, SearchError> {
        let body = json!({
            "query": {"bool": {"must": [
                {"term": {"id": id}},
                {"term": {"dataset": dataset}},
                {"term": {"organisation": org_id}}
            ]}},
            "size": 1
        });
        let response = self
            .client()
            .request(
                Method::POST,
                &format!("{EXAMPLE_INDEX_ALIAS}/_search"),
                Some(&body),
            )
            .await?;

        Self::hits(&response)
            .into_iter()
            .next()
            .map(|source| {
                serde_json::from_value(source).map_err(|e| SearchError::Decode(e.to_string()))
            })
            .transpose()
    }

    /// Whether an example already exists for (trace, dataset)
    pub async fn example_exists_for_trace(
        &self,
        trace: &str,
        dataset: &str,
    ) -> Result<bool, SearchError> {
        let body = json!({
            "query": {"bool": {"must": [
                {"term": {"trace": trace}},
                {"term": {"dataset": dataset}}
            ]}},
            "size": 0
        });
        let response = self
            .client()
            .request(
                Method::POST,
                &format!("{EXAMPLE_INDEX_ALIAS}/_search"),
                Some(&body),
            )
            .await?;

        let total = response["hits"]["total"]["value"].as_i64().unwrap_or(0);
        Ok(total > 0)
    }

    /// Partial merge onto an example; must match the organisation
    pub async fn update_example(
        &self,
        id: &str,
        patch: &JsonValue,
        org_id: &str,
    ) -> Result<bool, SearchError> {
        // Verify ownership before writing
        let response = match self
            .client()
            .request(
                Method::GET,
                &format!("{EXAMPLE_INDEX_ALIAS}/_doc/{id}"),
                None,
            )
            .await
        {
            Ok(r) => r,
            Err(SearchError::Request { status: 404, .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        let owner = response["_source"]["organisation"].as_str();
        if response["found"].as_bool() != Some(true) || owner != Some(org_id) {
            return Ok(false);
        }

        self.client()
            .request(
                Method::POST,
                &format!("{EXAMPLE_INDEX_ALIAS}/_update/{id}"),
                Some(&json!({"doc": patch})),
            )
            .await?;
        Ok(true)
    }
}
