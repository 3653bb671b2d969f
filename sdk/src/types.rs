//! Wire types shared with the server

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Reference outputs used by comparison metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExampleOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad: Option<JsonValue>,
}

/// One test case in a dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub dataset: String,
    pub organisation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Captured spans to replay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<JsonValue>,
    /// Direct input value (alternative to `spans`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ExampleOutputs>,
}

/// One run of a dataset through user code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub dataset: String,
    pub organisation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateExperiment {
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreAndStoreRequest {
    pub output: JsonValue,
    #[serde(rename = "traceId", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreAndStoreResponse {
    pub success: bool,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(rename = "exampleId")]
    pub example_id: String,
    #[serde(default)]
    pub errors: Option<BTreeMap<String, String>>,
}
