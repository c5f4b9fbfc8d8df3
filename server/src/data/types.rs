//! Row and parameter types shared by the repositories
//!
//! Rows serialize with camelCase keys, which is the shape the HTTP API returns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pulse::TraceStatus;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

// ============================================================================
// Traces & Sessions
// ============================================================================

/// A stored trace, scoped to a project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRow {
    pub trace_id: String,
    pub project_id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model_requested: String,
    pub model_used: Option<String>,
    pub provider_request_id: Option<String>,
    pub request_body: Value,
    pub response_body: Option<Value>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub output_text: Option<String>,
    pub finish_reason: Option<String>,
    pub status: TraceStatus,
    pub error: Option<Value>,
    pub cost_cents: Option<f64>,
    pub latency_ms: i64,
    pub metadata: Option<Value>,
}

/// Filters for listing traces
#[derive(Debug, Clone)]
pub struct ListTracesParams {
    pub project_id: String,
    pub session_id: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub status: Option<TraceStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl ListTracesParams {
    pub fn new(project_id: impl Into<String>, limit: u32, offset: u32) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: None,
            provider: None,
            model: None,
            status: None,
            date_from: None,
            date_to: None,
            limit,
            offset,
        }
    }
}

// ============================================================================
// Analytics
// ============================================================================

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Grouping of the `costOverTime` series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    #[default]
    Day,
    Hour,
    Model,
    Provider,
}

impl GroupBy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Model => "model",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "model" => Ok(Self::Model),
            "provider" => Ok(Self::Provider),
            other => Err(format!(
                "Invalid group_by '{}': expected day, hour, model or provider",
                other
            )),
        }
    }
}

/// Scalar aggregates over a date range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsTotals {
    pub total_cost: f64,
    pub total_requests: u64,
    pub total_sessions: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub avg_latency: f64,
    pub error_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDataPoint {
    pub period: String,
    pub cost_cents: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostByProvider {
    pub provider: String,
    pub cost_cents: f64,
    pub requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsByModel {
    pub provider: String,
    pub model: String,
    pub requests: u64,
    pub cost_cents: f64,
    pub avg_latency: f64,
    pub total_tokens: u64,
    pub error_rate: f64,
}
