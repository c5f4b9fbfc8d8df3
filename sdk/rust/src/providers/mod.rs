//! Provider clients and the tracing adapter
//!
//! [`LlmClient`] is the seam between the application and a provider API.
//! [`Observed`] wraps any client and records a trace for every call while
//! returning the provider result unchanged.

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;

use crate::buffer::TraceBuffer;
use crate::error::ProviderError;
use crate::normalize::normalize_response;
use crate::stream::{Accumulate, ChatChunkAccumulator, EventStream, StreamAccumulator, TracedStream};
use crate::trace::{PendingTrace, extract_pulse_params, request_map, resolve_trace_metadata};
use crate::types::{ObserveOptions, Provider};

/// Result of a provider call
pub enum LlmResponse {
    Complete(Value),
    Stream(EventStream),
}

impl LlmResponse {
    pub fn into_complete(self) -> Option<Value> {
        match self {
            Self::Complete(value) => Some(value),
            Self::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<EventStream> {
        match self {
            Self::Stream(stream) => Some(stream),
            Self::Complete(_) => None,
        }
    }
}

impl std::fmt::Debug for LlmResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A provider API taking a JSON request body
///
/// Requests with `"stream": true` return [`LlmResponse::Stream`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError>;
}

/// Client wrapper that records a trace for every call
pub struct Observed<C> {
    client: C,
    buffer: Arc<TraceBuffer>,
    options: ObserveOptions,
}

impl<C: LlmClient> Observed<C> {
    pub fn new(client: C, buffer: Arc<TraceBuffer>, options: ObserveOptions) -> Self {
        Self {
            client,
            buffer,
            options,
        }
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Forward a request, capturing its trace
    ///
    /// `pulse_session_id` and `pulse_metadata` keys are removed from the body
    /// before it is sent.
    pub async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError> {
        let (body, params) = extract_pulse_params(request);
        if !self.buffer.is_enabled() {
            return self.client.create(body).await;
        }

        let provider = self.client.provider();
        let context = resolve_trace_metadata(&self.options, params);
        let pending = PendingTrace::start(self.buffer.clone(), provider, request_map(&body), context);

        match self.client.create(body).await {
            Ok(LlmResponse::Complete(response)) => {
                pending.succeed(&normalize_response(provider, &response));
                Ok(LlmResponse::Complete(response))
            }
            Ok(LlmResponse::Stream(stream)) => {
                let accumulator: Box<dyn Accumulate> = match provider {
                    Provider::Anthropic => Box::new(StreamAccumulator::new()),
                    Provider::OpenAi | Provider::OpenRouter => Box::new(ChatChunkAccumulator::new()),
                };
                let traced = TracedStream::new(stream, accumulator, pending);
                Ok(LlmResponse::Stream(Box::pin(traced)))
            }
            Err(error) => {
                pending.fail(&error);
                Err(error)
            }
        }
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for Observed<C> {
    fn provider(&self) -> Provider {
        self.client.provider()
    }

    async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError> {
        Observed::create(self, request).await
    }
}

fn wants_stream(request: &Value) -> bool {
    request.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

/// Provider error message from a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Turn a non-2xx provider response into a [`ProviderError::Api`]
async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Decode an SSE response into JSON events
///
/// Ends at `[DONE]`; an in-band `error` event becomes a stream error.
fn sse_events(provider: Provider, response: reqwest::Response) -> EventStream {
    let stream = async_stream::stream! {
        let mut events = std::pin::pin!(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(ProviderError::Stream(e.to_string()));
                    break;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                break;
            }

            match serde_json::from_str::<Value>(data) {
                Ok(value) if event.event == "error" || value.get("type").and_then(Value::as_str) == Some("error") => {
                    let message = value
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or("stream error")
                        .to_string();
                    yield Err(ProviderError::Api { provider, status: 200, message });
                    break;
                }
                Ok(value) => yield Ok(value),
                Err(e) => {
                    yield Err(ProviderError::Decode(e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::testing::recording_buffer;
    use crate::types::TraceStatus;
    use futures::stream;
    use serde_json::json;

    struct FakeClient {
        provider: Provider,
        result: fn(&Value) -> Result<LlmResponse, ProviderError>,
    }

    #[async_trait]
    impl LlmClient for FakeClient {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError> {
            (self.result)(&request)
        }
    }

    fn echo_openai(request: &Value) -> Result<LlmResponse, ProviderError> {
        assert!(request.get("pulse_session_id").is_none());
        assert!(request.get("pulse_metadata").is_none());
        Ok(LlmResponse::Complete(json!({
            "id": "chatcmpl-abc",
            "model": "gpt-4o",
            "choices": [{"message": {"content": "pong"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1000, "completion_tokens": 500}
        })))
    }

    fn rate_limited(_: &Value) -> Result<LlmResponse, ProviderError> {
        Err(ProviderError::Api {
            provider: Provider::OpenAi,
            status: 429,
            message: "Rate limit".into(),
        })
    }

    fn chunk_stream(_: &Value) -> Result<LlmResponse, ProviderError> {
        let chunks = vec![
            Ok(json!({"id": "c1", "model": "gpt-4o-mini", "choices": [{"delta": {"content": "a"}}]})),
            Ok(json!({"id": "c1", "model": "gpt-4o-mini", "choices": [{"delta": {"content": "b"}, "finish_reason": "length"}]})),
        ];
        Ok(LlmResponse::Stream(Box::pin(stream::iter(chunks))))
    }

    #[tokio::test]
    async fn test_observed_records_success_and_returns_response() {
        let (buffer, _) = recording_buffer(100);
        let client = Observed::new(
            FakeClient { provider: Provider::OpenAi, result: echo_openai },
            buffer.clone(),
            ObserveOptions::default(),
        );

        let response = client
            .create(json!({
                "model": "gpt-4o",
                "messages": [],
                "pulse_session_id": "2d9b8f8e-0c8e-4f4b-8f7e-8d6f1c2a3b4c",
                "pulse_metadata": {"feature": "chat"}
            }))
            .await
            .unwrap()
            .into_complete()
            .unwrap();
        assert_eq!(response["choices"][0]["message"]["content"], json!("pong"));

        let traces = buffer.pending();
        assert_eq!(traces.len(), 1);
        let trace = &traces[0];
        assert_eq!(trace.status, TraceStatus::Success);
        assert_eq!(trace.cost_cents, Some(0.75));
        assert_eq!(
            trace.session_id.as_deref(),
            Some("2d9b8f8e-0c8e-4f4b-8f7e-8d6f1c2a3b4c")
        );
        assert_eq!(trace.metadata.as_ref().unwrap()["feature"], json!("chat"));
        assert!(!trace.request_body.contains_key("pulse_session_id"));
        assert_eq!(trace.provider_request_id.as_deref(), Some("chatcmpl-abc"));
    }

    #[tokio::test]
    async fn test_observed_records_error_and_reraises() {
        let (buffer, _) = recording_buffer(100);
        let client = Observed::new(
            FakeClient { provider: Provider::OpenAi, result: rate_limited },
            buffer.clone(),
            ObserveOptions::new().with_session_id("5e0d6a2c-1b3f-4e8a-9c7d-0a1b2c3d4e5f"),
        );

        let err = client.create(json!({"model": "gpt-4o"})).await.unwrap_err();
        assert_eq!(err.status(), Some(429));

        let traces = buffer.pending();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].status, TraceStatus::Error);
        assert_eq!(traces[0].model_requested, "gpt-4o");
        assert_eq!(
            traces[0].session_id.as_deref(),
            Some("5e0d6a2c-1b3f-4e8a-9c7d-0a1b2c3d4e5f")
        );
        assert_eq!(traces[0].error.as_ref().unwrap().name, "ApiError");
    }

    #[tokio::test]
    async fn test_observed_drops_non_uuid_session_id() {
        let (buffer, _) = recording_buffer(100);
        let client = Observed::new(
            FakeClient { provider: Provider::OpenAi, result: echo_openai },
            buffer.clone(),
            ObserveOptions::default(),
        );

        client
            .create(json!({"model": "gpt-4o", "messages": [], "pulse_session_id": "conversation-42"}))
            .await
            .unwrap();

        let traces = buffer.pending();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].session_id, None);
        assert!(!traces[0].request_body.contains_key("pulse_session_id"));
    }

    #[tokio::test]
    async fn test_observed_stream_records_after_consumption() {
        let (buffer, _) = recording_buffer(100);
        let client = Observed::new(
            FakeClient { provider: Provider::OpenAi, result: chunk_stream },
            buffer.clone(),
            ObserveOptions::default(),
        );

        let mut events = client
            .create(json!({"model": "gpt-4o-mini", "stream": true}))
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        assert!(buffer.pending().is_empty());

        let mut count = 0;
        while let Some(event) = events.next().await {
            event.unwrap();
            count += 1;
        }
        assert_eq!(count, 2);

        let traces = buffer.pending();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].output_text.as_deref(), Some("ab"));
        assert_eq!(traces[0].finish_reason.as_deref(), Some("length"));
    }

    #[tokio::test]
    async fn test_disabled_sdk_passes_through() {
        let transport = Arc::new(crate::buffer::testing::RecordingTransport::default());
        let mut config = crate::buffer::testing::test_config(10);
        config.enabled = false;
        let buffer = TraceBuffer::new(config, transport);
        let client = Observed::new(
            FakeClient { provider: Provider::OpenAi, result: echo_openai },
            buffer.clone(),
            ObserveOptions::default(),
        );

        client
            .create(json!({"model": "gpt-4o", "pulse_session_id": "x"}))
            .await
            .unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid model","type":"invalid_request_error"}}"#),
            "Invalid model"
        );
        assert_eq!(error_message(r#"{"error":"nope"}"#), "nope");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_wants_stream() {
        assert!(wants_stream(&json!({"stream": true})));
        assert!(!wants_stream(&json!({"stream": false})));
        assert!(!wants_stream(&json!({})));
    }
}
