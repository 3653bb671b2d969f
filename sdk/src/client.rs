//! Typed HTTP client for the AIQA server

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AiqaError;
use crate::types::{
    CreateExperiment, Example, Experiment, ScoreAndStoreRequest, ScoreAndStoreResponse,
};

/// Environment variable for the server base URL
pub const ENV_SERVER_URL: &str = "AIQA_SERVER_URL";

/// Environment variable for the API key (sent as `Authorization: ApiKey …`)
pub const ENV_API_KEY: &str = "AIQA_API_KEY";

#[derive(Clone)]
pub struct AiqaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AiqaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build a client from `AIQA_SERVER_URL` and `AIQA_API_KEY`
    pub fn from_env() -> Result<Self, AiqaError> {
        let base_url = std::env::var(ENV_SERVER_URL)
            .map_err(|_| AiqaError::Config(format!("{ENV_SERVER_URL} is not set")))?;
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| AiqaError::Config(format!("{ENV_API_KEY} is not set")))?;
        Ok(Self::new(base_url, api_key))
    }

    pub async fn create_experiment(
        &self,
        request: &CreateExperiment,
    ) -> Result<Experiment, AiqaError> {
        self.post("/experiment", request).await
    }

    pub async fn get_experiment(&self, id: &str) -> Result<Experiment, AiqaError> {
        self.get(&format!("/experiment/{id}")).await
    }

    /// Fetch examples for a dataset, bounded by `limit`
    pub async fn list_examples(
        &self,
        dataset: &str,
        limit: usize,
    ) -> Result<Vec<Example>, AiqaError> {
        self.get(&format!("/example?dataset={dataset}&limit={limit}"))
            .await
    }

    pub async fn score_and_store(
        &self,
        experiment_id: &str,
        example_id: &str,
        request: &ScoreAndStoreRequest,
    ) -> Result<ScoreAndStoreResponse, AiqaError> {
        self.post(
            &format!("/experiment/{experiment_id}/example/{example_id}/scoreAndStore"),
            request,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AiqaError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("ApiKey {}", self.api_key))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AiqaError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("ApiKey {}", self.api_key))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AiqaError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<JsonValue>()
                .await
                .ok()
                .and_then(|body| body["error"].as_str().map(String::from))
                .unwrap_or_else(|| status.to_string());
            return Err(AiqaError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| AiqaError::Decode(e.to_string()))
    }
}
