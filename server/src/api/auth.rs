//! Bearer API key authentication
//!
//! The plaintext key is hashed and looked up in `api_keys`. On success the
//! owning [`ProjectId`] is inserted into the request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use super::types::ApiError;
use crate::data::ProjectRepository;
use crate::utils::api_key::{extract_bearer_token, hash_api_key};

#[derive(Clone)]
pub struct AuthState {
    pub projects: Arc<dyn ProjectRepository>,
}

/// Project the authenticated API key belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId(pub String);

pub async fn require_api_key(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid Authorization header"))?;

    let project_id = state
        .projects
        .project_id_for_key_hash(&hash_api_key(token))
        .await?
        .ok_or_else(|| {
            tracing::debug!("Rejected unknown API key");
            ApiError::unauthorized("Invalid API key")
        })?;

    request.extensions_mut().insert(ProjectId(project_id));
    Ok(next.run(request).await)
}
