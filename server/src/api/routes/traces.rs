//! Trace ingestion and query endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use pulse::TraceStatus;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::api::auth::ProjectId;
use crate::api::extractors::{JsonBody, ValidatedQuery};
use crate::api::types::ApiError;
use crate::core::constants::{DEFAULT_TRACE_LIMIT, MAX_TRACE_LIMIT};
use crate::data::types::ListTracesParams;
use crate::domain::TraceService;
use crate::domain::traces::validate_uuid;
use crate::utils::time::parse_flexible_timestamp;

pub fn routes(traces: TraceService) -> Router<()> {
    Router::new()
        .route("/traces/batch", post(ingest_batch))
        .route("/traces", get(list_traces))
        .route("/traces/{id}", get(get_trace))
        .with_state(traces)
}

fn default_limit() -> u32 {
    DEFAULT_TRACE_LIMIT
}

fn validate_timestamp_param(value: &str) -> Result<(), ValidationError> {
    match parse_flexible_timestamp(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("timestamp").with_message(
            "Invalid timestamp: use RFC 3339 or epoch seconds/milliseconds".into(),
        )),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TraceListQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub session_id: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Provider must be 1-50 characters"))]
    pub provider: Option<String>,
    pub model: Option<String>,
    pub status: Option<TraceStatus>,
    #[validate(custom(function = "validate_timestamp_param"))]
    pub date_from: Option<String>,
    #[validate(custom(function = "validate_timestamp_param"))]
    pub date_to: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = MAX_TRACE_LIMIT, message = "Limit must be between 1 and 1000"))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl TraceListQuery {
    fn into_params(self, project_id: String) -> ListTracesParams {
        ListTracesParams {
            project_id,
            session_id: self.session_id,
            provider: self.provider,
            model: self.model,
            status: self.status,
            date_from: self.date_from.as_deref().and_then(parse_flexible_timestamp),
            date_to: self.date_to.as_deref().and_then(parse_flexible_timestamp),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// POST /v1/traces/batch
pub async fn ingest_batch(
    State(traces): State<TraceService>,
    Extension(ProjectId(project_id)): Extension<ProjectId>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let result = traces.ingest(&project_id, body).await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

/// GET /v1/traces
pub async fn list_traces(
    State(traces): State<TraceService>,
    Extension(ProjectId(project_id)): Extension<ProjectId>,
    ValidatedQuery(query): ValidatedQuery<TraceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = traces.query(query.into_params(project_id)).await?;
    Ok(Json(list))
}

/// GET /v1/traces/{id}
pub async fn get_trace(
    State(traces): State<TraceService>,
    Extension(ProjectId(project_id)): Extension<ProjectId>,
    Path(trace_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let trace = traces
        .get(&project_id, &trace_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Trace not found"))?;
    Ok(Json(trace))
}
