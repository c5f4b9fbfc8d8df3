//! Public trace types shared by the SDK and the collection service

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a traced call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Success,
    Error,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details captured on a failed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceError {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One recorded LLM call, in the wire format accepted by `POST /v1/traces/batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: Uuid,
    /// Call start
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
    pub model_requested: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_request_id: Option<String>,
    pub request_body: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub status: TraceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TraceError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<f64>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Provider-agnostic view of a completed call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub content: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    /// Normalized finish reason (stop, length, tool_calls, ...)
    pub finish_reason: Option<String>,
    pub model: String,
    /// Provider-supplied cost (OpenRouter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<f64>,
    #[serde(skip)]
    pub response_id: Option<String>,
}

/// Per-client trace options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObserveOptions {
    /// Groups related traces (must be a UUID to pass server validation)
    pub session_id: Option<String>,
    /// Attached to every trace from this client
    pub metadata: Option<Map<String, Value>>,
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Provider::OpenAi).unwrap(), json!("openai"));
        assert_eq!(
            serde_json::to_value(Provider::OpenRouter).unwrap(),
            json!("openrouter")
        );
        assert_eq!(Provider::Anthropic.to_string(), "anthropic");
    }

    #[test]
    fn test_trace_status_parse() {
        assert_eq!(TraceStatus::parse("success"), Some(TraceStatus::Success));
        assert_eq!(TraceStatus::parse("error"), Some(TraceStatus::Error));
        assert_eq!(TraceStatus::parse("ok"), None);
    }

    #[test]
    fn test_trace_omits_absent_fields() {
        let trace = Trace {
            trace_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            provider: Provider::OpenAi,
            model_requested: "gpt-4o".to_string(),
            model_used: None,
            provider_request_id: None,
            request_body: Map::new(),
            response_body: None,
            input_tokens: None,
            output_tokens: None,
            output_text: None,
            finish_reason: None,
            status: TraceStatus::Error,
            error: None,
            cost_cents: None,
            latency_ms: 12,
            session_id: None,
            metadata: None,
        };

        let value = serde_json::to_value(&trace).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("cost_cents"));
        assert!(!obj.contains_key("response_body"));
        assert_eq!(obj["status"], json!("error"));
        assert_eq!(obj["latency_ms"], json!(12));
    }

    #[test]
    fn test_normalized_response_camel_case() {
        let response = NormalizedResponse {
            content: Some("hi".into()),
            input_tokens: Some(3),
            output_tokens: Some(1),
            finish_reason: Some("stop".into()),
            model: "gpt-4o".into(),
            cost_cents: None,
            response_id: Some("chatcmpl-1".into()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["inputTokens"], json!(3));
        assert_eq!(value["finishReason"], json!("stop"));
        assert!(value.get("costCents").is_none());
        assert!(value.get("responseId").is_none());
    }
}
