//! Trace construction

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::buffer::TraceBuffer;
use crate::error::ProviderError;
use crate::pricing::calculate_cost;
use crate::types::{NormalizedResponse, ObserveOptions, Provider, Trace, TraceError, TraceStatus};

/// Request body key carrying a session id for this call only
pub const PULSE_SESSION_ID_KEY: &str = "pulse_session_id";
/// Request body key carrying trace metadata for this call only
pub const PULSE_METADATA_KEY: &str = "pulse_metadata";

const UNKNOWN_MODEL: &str = "unknown";

/// Correlation fields found in a request payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PulseParams {
    pub session_id: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// Remove `pulse_*` keys from a request body so they never reach the provider
pub fn extract_pulse_params(mut body: Value) -> (Value, PulseParams) {
    let Some(obj) = body.as_object_mut() else {
        return (body, PulseParams::default());
    };

    let session_id = match obj.remove(PULSE_SESSION_ID_KEY) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    let metadata = match obj.remove(PULSE_METADATA_KEY) {
        Some(Value::Object(m)) => Some(m),
        _ => None,
    };

    (
        body,
        PulseParams {
            session_id,
            metadata,
        },
    )
}

/// Client options win over payload-embedded values
///
/// The collector rejects a whole batch when any session id is not a UUID, so
/// such ids are dropped here and the trace is sent without a session.
pub fn resolve_trace_metadata(options: &ObserveOptions, params: PulseParams) -> ObserveOptions {
    let session_id = options
        .session_id
        .clone()
        .or(params.session_id)
        .filter(|id| {
            let valid = Uuid::parse_str(id).is_ok();
            if !valid {
                tracing::warn!(session_id = %id, "Ignoring session id that is not a UUID");
            }
            valid
        });
    ObserveOptions {
        session_id,
        metadata: options.metadata.clone().or(params.metadata),
    }
}

pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn model_requested(request: &Map<String, Value>) -> String {
    request
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_MODEL)
        .to_string()
}

/// Provider-supplied cost wins; otherwise compute from tokens when both are known
fn resolve_cost(response: &NormalizedResponse) -> Option<f64> {
    if response.cost_cents.is_some() {
        return response.cost_cents;
    }
    match (response.input_tokens, response.output_tokens) {
        (Some(input), Some(output)) => calculate_cost(&response.model, input, output),
        _ => None,
    }
}

pub fn build_trace(
    request: &Map<String, Value>,
    response: &NormalizedResponse,
    provider: Provider,
    started_at: DateTime<Utc>,
    latency_ms: u64,
    context: &ObserveOptions,
) -> Trace {
    let response_body = match serde_json::to_value(response) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    Trace {
        trace_id: Uuid::new_v4(),
        timestamp: started_at,
        provider,
        model_requested: model_requested(request),
        model_used: (!response.model.is_empty()).then(|| response.model.clone()),
        provider_request_id: response.response_id.clone(),
        request_body: request.clone(),
        response_body,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        output_text: response.content.clone(),
        finish_reason: response.finish_reason.clone(),
        status: TraceStatus::Success,
        error: None,
        cost_cents: resolve_cost(response),
        latency_ms,
        session_id: context.session_id.clone(),
        metadata: context.metadata.clone(),
    }
}

/// Source chain of an error, one cause per line
fn error_chain(error: &dyn StdError) -> Option<String> {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    (!causes.is_empty()).then(|| causes.join("\n"))
}

pub fn build_error_trace(
    request: &Map<String, Value>,
    error: &ProviderError,
    provider: Provider,
    started_at: DateTime<Utc>,
    latency_ms: u64,
    context: &ObserveOptions,
) -> Trace {
    Trace {
        trace_id: Uuid::new_v4(),
        timestamp: started_at,
        provider,
        model_requested: model_requested(request),
        model_used: None,
        provider_request_id: None,
        request_body: request.clone(),
        response_body: None,
        input_tokens: None,
        output_tokens: None,
        output_text: None,
        finish_reason: None,
        status: TraceStatus::Error,
        error: Some(TraceError {
            name: error.name().to_string(),
            message: error.to_string(),
            stack: error_chain(error),
        }),
        cost_cents: None,
        latency_ms,
        session_id: context.session_id.clone(),
        metadata: context.metadata.clone(),
    }
}

/// Request body as stored on the trace
pub(crate) fn request_map(body: &Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("body".to_string(), other.clone());
            map
        }
    }
}

/// A call in flight: everything needed to record its trace once it settles
pub(crate) struct PendingTrace {
    buffer: Arc<TraceBuffer>,
    provider: Provider,
    request_body: Map<String, Value>,
    context: ObserveOptions,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl PendingTrace {
    pub(crate) fn start(
        buffer: Arc<TraceBuffer>,
        provider: Provider,
        request_body: Map<String, Value>,
        context: ObserveOptions,
    ) -> Self {
        Self {
            buffer,
            provider,
            request_body,
            context,
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    pub(crate) fn succeed(self, response: &NormalizedResponse) {
        let trace = build_trace(
            &self.request_body,
            response,
            self.provider,
            self.started_at,
            elapsed_ms(self.start),
            &self.context,
        );
        self.buffer.add(trace);
    }

    pub(crate) fn fail(self, error: &ProviderError) {
        let trace = build_error_trace(
            &self.request_body,
            error,
            self.provider,
            self.started_at,
            elapsed_ms(self.start),
            &self.context,
        );
        self.buffer.add(trace);
    }
}
