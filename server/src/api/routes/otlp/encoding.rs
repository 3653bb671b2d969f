//! OTLP content-type encoding and decoding
//!
//! Supports both protobuf (application/x-protobuf) and JSON
//! (application/json) formats per the OpenTelemetry Protocol specification.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::api::types::ApiError;

/// Content type for OTLP requests/responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpContentType {
    Protobuf,
    Json,
}

impl OtlpContentType {
    /// Parse content type from HTTP headers.
    /// Defaults to protobuf if content type is missing or unrecognized.
    #[inline]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("application/json") {
            OtlpContentType::Json
        } else {
            OtlpContentType::Protobuf
        }
    }

    /// Get the content type header value for responses
    #[inline]
    pub fn as_header_value(self) -> &'static str {
        match self {
            OtlpContentType::Protobuf => "application/x-protobuf",
            OtlpContentType::Json => "application/json",
        }
    }
}

/// Decode an OTLP request from bytes based on content type
#[inline]
pub fn decode_request<T>(body: &Bytes, content_type: OtlpContentType) -> Result<T, ApiError>
where
    T: Message + Default + for<'de> Deserialize<'de>,
{
    match content_type {
        OtlpContentType::Protobuf => T::decode(body.as_ref()).map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode OTLP protobuf request");
            ApiError::invalid_argument("Failed to decode protobuf request")
        }),
        OtlpContentType::Json => serde_json::from_slice(body.as_ref()).map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode OTLP JSON request");
            ApiError::invalid_argument("Failed to decode JSON request")
        }),
    }
}

/// Create a successful OTLP response with the correct content type
pub fn success_response<T>(response: &T, content_type: OtlpContentType) -> Response
where
    T: Message + Serialize,
{
    let encoded = match content_type {
        OtlpContentType::Protobuf => Ok(response.encode_to_vec()),
        OtlpContentType::Json => serde_json::to_vec(response).map_err(|e| e.to_string()),
    };

    match encoded {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type.as_header_value())],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode OTLP response");
            ApiError::internal("Failed to encode response").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::collector::trace::v1::{
        ExportTraceServiceRequest, ExportTraceServiceResponse,
    };

    #[test]
    fn test_content_type_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-protobuf".parse().unwrap(),
        );
        assert_eq!(
            OtlpContentType::from_headers(&headers),
            OtlpContentType::Protobuf
        );

        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert_eq!(
            OtlpContentType::from_headers(&headers),
            OtlpContentType::Json
        );

        // Missing or unknown defaults to protobuf
        assert_eq!(
            OtlpContentType::from_headers(&HeaderMap::new()),
            OtlpContentType::Protobuf
        );
    }

    #[test]
    fn test_decode_protobuf_roundtrip() {
        let request = ExportTraceServiceRequest {
            resource_spans: vec![],
        };
        let bytes = Bytes::from(request.encode_to_vec());
        let decoded: ExportTraceServiceRequest =
            decode_request(&bytes, OtlpContentType::Protobuf).unwrap();
        assert_eq!(decoded.resource_spans.len(), 0);
    }

    #[test]
    fn test_decode_json_camel_case() {
        let json = r#"{
            "resourceSpans": [{
                "scopeSpans": [{
                    "spans": [{
                        "traceId": "0102030405060708090a0b0c0d0e0f10",
                        "spanId": "0102030405060708",
                        "name": "test-span",
                        "kind": 1
                    }]
                }]
            }]
        }"#;
        let decoded: ExportTraceServiceRequest =
            decode_request(&Bytes::from(json), OtlpContentType::Json).unwrap();
        assert_eq!(
            decoded.resource_spans[0].scope_spans[0].spans[0].name,
            "test-span"
        );
        assert_eq!(decoded.resource_spans[0].scope_spans[0].spans[0].kind, 1);
    }

    #[test]
    fn test_decode_invalid_inputs() {
        let result: Result<ExportTraceServiceRequest, _> =
            decode_request(&Bytes::from("not json"), OtlpContentType::Json);
        assert!(result.is_err());

        let result: Result<ExportTraceServiceRequest, _> =
            decode_request(&Bytes::from("not protobuf"), OtlpContentType::Protobuf);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_response_serializes_to_empty_object() {
        // The JSON body of a successful export is `{}`
        let response = ExportTraceServiceResponse {
            partial_success: None,
        };
        assert_eq!(serde_json::to_string(&response).unwrap(), "{}");
    }
}
