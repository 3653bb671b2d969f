//! LLM-as-judge provider adapters
//!
//! Calls the configured provider's chat endpoint at temperature 0 and
//! extracts the first finite number from the response text (accepting
//! forms such as "7" or "Score: 7/10").

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Value as JsonValue, json};

use super::ScoreError;
use crate::core::constants::JUDGE_REQUEST_TIMEOUT_SECS;
use crate::data::types::{Example, Metric, Model, ModelProvider};

const OPENAI_BASE: &str = "https://api.openai.com";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const GOOGLE_BASE: &str = "https://generativelanguage.googleapis.com";

/// Standard template used when the metric carries criteria but no prompt
const CRITERIA_TEMPLATE: &str = "You are an evaluator. Score the output below \
from 0 to 10 against these criteria:\n{criteria}\n\nOutput:\n{output}\n\n\
Respond with a single number.";

/// Template built from the example's reference outputs
const GOOD_BAD_TEMPLATE: &str = "You are an evaluator. Score the output below \
from 0 to 10, where 10 closely resembles the good reference and 0 closely \
resembles the bad reference.\n\nGood reference:\n{good}\n\nBad reference:\n\
{bad}\n\nOutput:\n{output}\n\nRespond with a single number.";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

pub struct Judge {
    http: reqwest::Client,
}

impl Judge {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(JUDGE_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    /// Score `output` with the given org-owned model
    pub async fn score(
        &self,
        model: &Model,
        metric: &Metric,
        output: &JsonValue,
        example: &Example,
    ) -> Result<f64, ScoreError> {
        let prompt = build_prompt(metric, output, example)?;
        let text = self.complete(model, &prompt).await?;
        extract_number(&text).ok_or(ScoreError::NoNumber)
    }

    /// One chat completion at temperature 0, returning the response text
    async fn complete(&self, model: &Model, prompt: &str) -> Result<String, ScoreError> {
        let api_key = resolve_api_key(model)?;

        let (url, request) = match model.provider {
            ModelProvider::Openai => {
                let base = model.base_url.as_deref().unwrap_or(OPENAI_BASE);
                let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
                let request = self
                    .http
                    .post(&url)
                    .bearer_auth(&api_key)
                    .json(&json!({
                        "model": model.model,
                        "temperature": 0,
                        "messages": [{"role": "user", "content": prompt}]
                    }));
                (url, request)
            }
            ModelProvider::Azure => {
                let base = model.base_url.as_deref().ok_or_else(|| {
                    ScoreError::Misconfigured("base_url for azure deployment".into())
                })?;
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version=2024-02-01",
                    base.trim_end_matches('/'),
                    model.model
                );
                let request = self
                    .http
                    .post(&url)
                    .header("api-key", &api_key)
                    .json(&json!({
                        "temperature": 0,
                        "messages": [{"role": "user", "content": prompt}]
                    }));
                (url, request)
            }
            ModelProvider::Anthropic => {
                let base = model.base_url.as_deref().unwrap_or(ANTHROPIC_BASE);
                let url = format!("{}/v1/messages", base.trim_end_matches('/'));
                let request = self
                    .http
                    .post(&url)
                    .header("x-api-key", &api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&json!({
                        "model": model.model,
                        "max_tokens": 1024,
                        "temperature": 0,
                        "messages": [{"role": "user", "content": prompt}]
                    }));
                (url, request)
            }
            ModelProvider::Google => {
                let base = model.base_url.as_deref().unwrap_or(GOOGLE_BASE);
                let url = format!(
                    "{}/v1beta/models/{}:generateContent?key={}",
                    base.trim_end_matches('/'),
                    model.model,
                    api_key
                );
                let request = self.http.post(&url).json(&json!({
                    "contents": [{"parts": [{"text": prompt}]}],
                    "generationConfig": {"temperature": 0}
                }));
                (url, request)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| ScoreError::Provider(e.to_string()))?;
        let status = response.status();
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ScoreError::Provider(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(provider = model.provider.as_str(), %status, %url, "Judge call failed");
            return Err(ScoreError::Provider(format!(
                "{} returned {}",
                model.provider.as_str(),
                status
            )));
        }

        extract_text(model.provider, &body).ok_or_else(|| {
            ScoreError::Provider(format!(
                "{} response carried no text",
                model.provider.as_str()
            ))
        })
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_api_key(model: &Model) -> Result<String, ScoreError> {
    if let Some(key) = &model.api_key {
        return Ok(key.clone());
    }
    let env_var = match model.provider {
        ModelProvider::Openai => "OPENAI_API_KEY",
        ModelProvider::Anthropic => "ANTHROPIC_API_KEY",
        ModelProvider::Google => "GOOGLE_API_KEY",
        ModelProvider::Azure => "AZURE_OPENAI_API_KEY",
    };
    std::env::var(env_var).map_err(|_| ScoreError::Misconfigured(format!("api key ({env_var})")))
}

/// Pull the completion text out of the provider-specific response shape
fn extract_text(provider: ModelProvider, body: &JsonValue) -> Option<String> {
    let text = match provider {
        ModelProvider::Openai | ModelProvider::Azure => {
            body["choices"][0]["message"]["content"].as_str()
        }
        ModelProvider::Anthropic => body["content"][0]["text"].as_str(),
        ModelProvider::Google => body["candidates"][0]["content"]["parts"][0]["text"].as_str(),
    };
    text.map(String::from)
}

/// Prompt resolution order: explicit metric prompt, then the good/bad
/// template, then criteria over the standard template
pub fn build_prompt(
    metric: &Metric,
    output: &JsonValue,
    example: &Example,
) -> Result<String, ScoreError> {
    let output_text = value_text(output);

    if let Some(prompt) = &metric.prompt {
        return Ok(format!("{prompt}\n\nOutput:\n{output_text}"));
    }

    if let Some(outputs) = &example.outputs
        && (outputs.good.is_some() || outputs.bad.is_some())
    {
        let good = outputs.good.as_ref().map(value_text).unwrap_or_default();
        let bad = outputs.bad.as_ref().map(value_text).unwrap_or_default();
        return Ok(GOOD_BAD_TEMPLATE
            .replace("{good}", &good)
            .replace("{bad}", &bad)
            .replace("{output}", &output_text));
    }

    if let Some(criteria) = &metric.prompt_criteria {
        return Ok(CRITERIA_TEMPLATE
            .replace("{criteria}", criteria)
            .replace("{output}", &output_text));
    }

    Err(ScoreError::Misconfigured(
        "prompt, promptCriteria, or example outputs".into(),
    ))
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First finite number in the text ("7", "Score: 7/10", "-2.5")
pub fn extract_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{ExampleOutputs, MetricKind};
    use serde_json::json;

    fn metric(prompt: Option<&str>, criteria: Option<&str>) -> Metric {
        Metric {
            id: "cats".into(),
            name: None,
            unit: None,
            kind: MetricKind::Llm,
            provider: None,
            model: Some("judge".into()),
            prompt: prompt.map(String::from),
            prompt_criteria: criteria.map(String::from),
            code: None,
            parameters: None,
        }
    }

    #[test]
    fn test_extract_number_forms() {
        assert_eq!(extract_number("7"), Some(7.0));
        assert_eq!(extract_number("Score: 7/10"), Some(7.0));
        assert_eq!(extract_number("I'd say -2.5 overall"), Some(-2.5));
        assert_eq!(extract_number("no digits here"), None);
    }

    #[test]
    fn test_build_prompt_prefers_metric_prompt() {
        let prompt = build_prompt(
            &metric(Some("Rate cat-ness 0-10."), None),
            &json!("meow"),
            &Example::default(),
        )
        .unwrap();
        assert!(prompt.starts_with("Rate cat-ness 0-10."));
        assert!(prompt.contains("meow"));
    }

    #[test]
    fn test_build_prompt_good_bad_template() {
        let example = Example {
            outputs: Some(ExampleOutputs {
                good: Some(json!("purr")),
                bad: Some(json!("bark")),
            }),
            ..Default::default()
        };
        let prompt = build_prompt(&metric(None, None), &json!("meow"), &example).unwrap();
        assert!(prompt.contains("purr"));
        assert!(prompt.contains("bark"));
        assert!(prompt.contains("meow"));
    }

    #[test]
    fn test_build_prompt_criteria_template() {
        let prompt = build_prompt(
            &metric(None, Some("sounds like a cat")),
            &json!("meow"),
            &Example::default(),
        )
        .unwrap();
        assert!(prompt.contains("sounds like a cat"));
        assert!(prompt.contains("meow"));
    }

    #[test]
    fn test_build_prompt_requires_some_source() {
        let err = build_prompt(&metric(None, None), &json!("meow"), &Example::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_extract_text_per_provider() {
        let openai = json!({"choices": [{"message": {"content": "7"}}]});
        assert_eq!(
            extract_text(ModelProvider::Openai, &openai),
            Some("7".into())
        );

        let anthropic = json!({"content": [{"type": "text", "text": "Score: 8/10"}]});
        assert_eq!(
            extract_text(ModelProvider::Anthropic, &anthropic),
            Some("Score: 8/10".into())
        );

        let google = json!({"candidates": [{"content": {"parts": [{"text": "9"}]}}]});
        assert_eq!(
            extract_text(ModelProvider::Google, &google),
            Some("9".into())
        );
    }
}
