//! Index lifecycle: versioned indices behind aliases
//!
//! Each logical index is addressed through an alias pointing at a versioned
//! physical index (`<base>_v<N>`). Migration creates `_vN+1`, reindexes, and
//! flips the alias in a single `_aliases` action so readers never see a gap.

use reqwest::Method;
use serde_json::{Value as JsonValue, json};

use super::client::EsClient;
use super::error::SearchError;
use crate::core::constants::{EXAMPLE_INDEX_ALIAS, SPAN_INDEX_ALIAS};

/// Mapping for the span index: the attribute bag is flattened, oversized
/// values live in a source-only subtree
fn span_mappings() -> JsonValue {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "trace": {"type": "keyword"},
                "parent": {"type": "keyword"},
                "organisation": {"type": "keyword"},
                "name": {"type": "text", "fields": {"keyword": {"type": "keyword"}}},
                "kind": {"type": "integer"},
                "status": {
                    "properties": {
                        "code": {"type": "integer"},
                        "message": {"type": "text"}
                    }
                },
                "start": {"type": "long"},
                "end": {"type": "long"},
                "duration": {"type": "long"},
                "attributes": {"type": "flattened"},
                "unindexed_attributes": {"type": "object", "enabled": false},
                "tags": {"type": "keyword"},
                "inputHash": {"type": "keyword"},
                "_seen": {"type": "keyword"},
                "experiment": {"type": "keyword"},
                "example": {"type": "keyword"},
                "input_tokens": {"type": "long"},
                "output_tokens": {"type": "long"},
                "cached_input_tokens": {"type": "long"},
                "total_tokens": {"type": "long"},
                "cost_usd": {"type": "double"}
            }
        }
    })
}

fn example_mappings() -> JsonValue {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "dataset": {"type": "keyword"},
                "organisation": {"type": "keyword"},
                "trace": {"type": "keyword"},
                "name": {"type": "text", "fields": {"keyword": {"type": "keyword"}}},
                "tags": {"type": "keyword"},
                "spans": {"type": "object", "enabled": false},
                "input": {"type": "flattened"},
                "outputs": {"type": "object", "enabled": false},
                "metrics": {"type": "object", "enabled": false},
                "created": {"type": "long"},
                "updated": {"type": "long"}
            }
        }
    })
}

/// Ensure an alias exists, creating `<alias>_v1` when missing
async fn ensure_alias(
    client: &EsClient,
    alias: &str,
    mappings: JsonValue,
) -> Result<(), SearchError> {
    let exists = client
        .request(Method::GET, &format!("_alias/{alias}"), None)
        .await;
    match exists {
        Ok(_) => return Ok(()),
        Err(SearchError::Request { status: 404, .. }) => {}
        Err(e) => return Err(e),
    }

    let index = format!("{alias}_v1");
    tracing::debug!(index = %index, alias, "Creating search index");

    let mut body = mappings;
    body["aliases"] = json!({alias: {}});
    match client.request(Method::PUT, &index, Some(&body)).await {
        Ok(_) => Ok(()),
        // Another node may have raced us to it
        Err(SearchError::Request { status: 400, body }) if body.contains("already_exists") => {
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Ensure both logical indices exist
pub async fn ensure_indices(client: &EsClient) -> Result<(), SearchError> {
    ensure_alias(client, SPAN_INDEX_ALIAS, span_mappings()).await?;
    ensure_alias(client, EXAMPLE_INDEX_ALIAS, example_mappings()).await?;
    Ok(())
}

/// Migrate an alias to the next index version: create `_vN+1`, reindex,
/// flip the alias atomically. Snapshot/predecessor cleanup is left to
/// operators.
pub async fn migrate(client: &EsClient, alias: &str) -> Result<String, SearchError> {
    let mappings = match alias {
        SPAN_INDEX_ALIAS => span_mappings(),
        EXAMPLE_INDEX_ALIAS => example_mappings(),
        _ => {
            return Err(SearchError::Decode(format!("unknown alias: {alias}")));
        }
    };

    let current = current_index(client, alias).await?;
    let next_version = parse_version(&current).unwrap_or(1) + 1;
    let next = format!("{alias}_v{next_version}");

    client.request(Method::PUT, &next, Some(&mappings)).await?;

    client
        .request(
            Method::POST,
            "_reindex?wait_for_completion=true",
            Some(&json!({
                "source": {"index": current},
                "dest": {"index": next}
            })),
        )
        .await?;

    client
        .request(
            Method::POST,
            "_aliases",
            Some(&json!({
                "actions": [
                    {"remove": {"index": current, "alias": alias}},
                    {"add": {"index": next, "alias": alias}}
                ]
            })),
        )
        .await?;

    tracing::info!(alias, from = %current, to = %next, "Alias migrated");
    Ok(next)
}

/// Administrative index deletion; never called from request paths
pub async fn delete_index(client: &EsClient, name: &str) -> Result<(), SearchError> {
    client.request(Method::DELETE, name, None).await?;
    Ok(())
}

async fn current_index(client: &EsClient, alias: &str) -> Result<String, SearchError> {
    let body = client
        .request(Method::GET, &format!("_alias/{alias}"), None)
        .await?;
    body.as_object()
        .and_then(|o| o.keys().next().cloned())
        .ok_or_else(|| SearchError::Decode(format!("alias {alias} resolves to no index")))
}

fn parse_version(index: &str) -> Option<u32> {
    index.rsplit_once("_v").and_then(|(_, v)| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("spans_v1"), Some(1));
        assert_eq!(parse_version("dataset_examples_v12"), Some(12));
        assert_eq!(parse_version("spans"), None);
    }

    #[test]
    fn test_span_mappings_shape() {
        let mappings = span_mappings();
        assert_eq!(
            mappings["mappings"]["properties"]["attributes"]["type"],
            "flattened"
        );
        assert_eq!(
            mappings["mappings"]["properties"]["unindexed_attributes"]["enabled"],
            false
        );
    }
}
