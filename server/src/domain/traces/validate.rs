//! Inbound batch validation
//!
//! Each element is deserialized into [`WireTrace`] and then checked with
//! `validator`. Every problem found is reported with a JSON-path-like
//! location (`[3].provider`), and one bad element rejects the whole batch.

use std::borrow::Cow;

use pulse::TraceStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::core::constants::{MAX_BATCH_SIZE, MAX_PROVIDER_LENGTH, MAX_TRACE_COUNTER};
use crate::data::types::TraceRow;
use crate::utils::time::parse_rfc3339;

/// One validation problem in an inbound batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDetail {
    pub path: String,
    pub message: String,
}

impl ValidationDetail {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validator for UUID-typed string fields
pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message(Cow::Borrowed("Invalid uuid")))
}

pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    match parse_rfc3339(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("datetime")
            .with_message(Cow::Borrowed("Invalid datetime: expected RFC 3339 with offset"))),
    }
}

/// Trace as sent by clients. Unknown fields are ignored.
#[derive(Debug, Deserialize, Validate)]
struct WireTrace {
    #[validate(custom(function = "validate_uuid"))]
    trace_id: String,
    #[validate(custom(function = "validate_timestamp"))]
    timestamp: String,
    #[validate(length(min = 1, max = 50))]
    provider: String,
    #[validate(length(min = 1))]
    model_requested: String,
    #[serde(default)]
    model_used: Option<String>,
    #[serde(default)]
    provider_request_id: Option<String>,
    request_body: Map<String, Value>,
    #[serde(default)]
    response_body: Option<Map<String, Value>>,
    #[serde(default)]
    #[validate(range(max = MAX_TRACE_COUNTER, message = "Must be at most 2147483647"))]
    input_tokens: Option<u64>,
    #[serde(default)]
    #[validate(range(max = MAX_TRACE_COUNTER, message = "Must be at most 2147483647"))]
    output_tokens: Option<u64>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
    status: TraceStatus,
    #[serde(default)]
    error: Option<Map<String, Value>>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    cost_cents: Option<f64>,
    #[validate(range(max = MAX_TRACE_COUNTER, message = "Must be at most 2147483647"))]
    latency_ms: u64,
    #[serde(default)]
    #[validate(custom(function = "validate_uuid"))]
    session_id: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl WireTrace {
    fn into_row(self, project_id: &str) -> Option<TraceRow> {
        let timestamp = parse_rfc3339(&self.timestamp)?;
        Some(TraceRow {
            trace_id: self.trace_id,
            project_id: project_id.to_string(),
            session_id: self.session_id,
            timestamp,
            provider: self.provider,
            model_requested: self.model_requested,
            model_used: self.model_used,
            provider_request_id: self.provider_request_id,
            request_body: Value::Object(self.request_body),
            response_body: self.response_body.map(Value::Object),
            input_tokens: self.input_tokens.map(saturating_i64),
            output_tokens: self.output_tokens.map(saturating_i64),
            output_text: self.output_text,
            finish_reason: self.finish_reason,
            status: self.status,
            error: self.error.map(Value::Object),
            cost_cents: self.cost_cents,
            latency_ms: saturating_i64(self.latency_ms),
            metadata: self.metadata.map(Value::Object),
        })
    }
}

/// Counters are range-checked to `MAX_TRACE_COUNTER` before conversion
fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Validate a raw batch and convert it into rows for `project_id`
pub fn parse_batch(project_id: &str, raw: Value) -> Result<Vec<TraceRow>, Vec<ValidationDetail>> {
    let Value::Array(items) = raw else {
        return Err(vec![ValidationDetail::new(
            "",
            "Expected an array of traces",
        )]);
    };

    if items.len() > MAX_BATCH_SIZE {
        return Err(vec![ValidationDetail::new(
            "",
            format!(
                "Batch contains {} traces, maximum is {}",
                items.len(),
                MAX_BATCH_SIZE
            ),
        )]);
    }

    let mut rows = Vec::with_capacity(items.len());
    let mut details = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match parse_element(index, item, project_id) {
            Ok(row) => rows.push(row),
            Err(mut errs) => details.append(&mut errs),
        }
    }

    if details.is_empty() {
        Ok(rows)
    } else {
        Err(details)
    }
}

fn parse_element(
    index: usize,
    item: Value,
    project_id: &str,
) -> Result<TraceRow, Vec<ValidationDetail>> {
    let wire: WireTrace = serde_json::from_value(item)
        .map_err(|e| vec![ValidationDetail::new(format!("[{index}]"), e.to_string())])?;

    if let Err(errors) = wire.validate() {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&field, &e.code));
                    ValidationDetail::new(format!("[{index}].{field}"), message)
                })
            })
            .collect();
        details.sort_by(|a, b| a.path.cmp(&b.path));
        return Err(details);
    }

    wire.into_row(project_id).ok_or_else(|| {
        vec![ValidationDetail::new(
            format!("[{index}].timestamp"),
            "Invalid datetime",
        )]
    })
}

fn default_message(field: &str, code: &str) -> String {
    match code {
        "length" if field == "provider" => {
            format!("Must be between 1 and {} characters", MAX_PROVIDER_LENGTH)
        }
        "length" => "Must not be empty".to_string(),
        "range" => "Must be non-negative".to_string(),
        other => format!("Invalid value ({other})"),
    }
}
