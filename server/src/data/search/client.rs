//! Low-level search engine HTTP client
//!
//! Speaks the engine's JSON REST API over a pooled reqwest client. All
//! higher-level operations (bulk, search, update, alias management) build
//! on the two request helpers here.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value as JsonValue;

use super::error::SearchError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
}

impl EsClient {
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a JSON request; non-2xx responses become typed errors
    /// (409 → Conflict, connection failures → Connection).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue, SearchError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(SearchError::from_reqwest)?;
        Self::decode_response(response, path).await
    }

    /// Bulk endpoint: newline-delimited JSON body
    pub async fn bulk(&self, ndjson: String) -> Result<JsonValue, SearchError> {
        let url = format!("{}/_bulk", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(ndjson)
            .send()
            .await
            .map_err(SearchError::from_reqwest)?;
        let body = Self::decode_response(response, "_bulk").await?;

        // Per-item failures surface in the body with HTTP 200
        if body.get("errors").and_then(JsonValue::as_bool) == Some(true) {
            let reason = first_bulk_error(&body).unwrap_or_else(|| "unknown bulk failure".into());
            return Err(SearchError::Request {
                status: 200,
                body: reason,
            });
        }
        Ok(body)
    }

    async fn decode_response(
        response: reqwest::Response,
        path: &str,
    ) -> Result<JsonValue, SearchError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(SearchError::from_reqwest)?;

        if status == StatusCode::CONFLICT {
            return Err(SearchError::Conflict(path.to_string()));
        }
        if !status.is_success() {
            return Err(SearchError::Request {
                status: status.as_u16(),
                body: truncate(&text, 512),
            });
        }

        serde_json::from_str(&text).map_err(|e| SearchError::Decode(e.to_string()))
    }
}

fn first_bulk_error(body: &JsonValue) -> Option<String> {
    body.get("items")?
        .as_array()?
        .iter()
        .find_map(|item| {
            let op = item.as_object()?.values().next()?;
            let error = op.get("error")?;
            Some(format!(
                "{}: {}",
                error.get("type").and_then(JsonValue::as_str).unwrap_or("error"),
                error.get("reason").and_then(JsonValue::as_str).unwrap_or("")
            ))
        })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_bulk_error_extracts_reason() {
        let body = json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}}}
            ]
        });
        assert_eq!(
            first_bulk_error(&body),
            Some("mapper_parsing_exception: failed to parse".to_string())
        );
    }

    #[test]
    fn test_first_bulk_error_none_when_clean() {
        let body = json!({"errors": false, "items": [{"index": {"status": 201}}]});
        assert_eq!(first_bulk_error(&body), None);
    }
}
