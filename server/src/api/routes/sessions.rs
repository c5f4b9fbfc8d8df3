//! Session endpoints

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::api::auth::ProjectId;
use crate::api::types::ApiError;
use crate::domain::TraceService;

pub fn routes(traces: TraceService) -> Router<()> {
    Router::new()
        .route("/sessions/{id}", get(get_session))
        .with_state(traces)
}

/// GET /v1/sessions/{id}
pub async fn get_session(
    State(traces): State<TraceService>,
    Extension(ProjectId(project_id)): Extension<ProjectId>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = traces
        .session_traces(&project_id, &session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;
    Ok(Json(session))
}
