//! Request extractors with Pulse error responses

use std::ops::Deref;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::types::ApiError;

/// Query extractor with automatic validation.
///
/// Parse and constraint failures both become a 400 with per-field details.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::invalid_query(vec![(String::new(), rejection.body_text())])
            })?;
        value
            .validate()
            .map_err(|errors| ApiError::invalid_query(validation_details(&errors)))?;
        Ok(Self(value))
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> Vec<(String, String)> {
    let mut details: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field));
                (field.to_string(), message)
            })
        })
        .collect();
    details.sort();
    details
}

/// Any JSON body, regardless of content type
///
/// Oversized bodies keep the 413 from the body limit layer; unparseable
/// ones become `400 Invalid JSON body`.
#[derive(Debug)]
pub struct JsonBody(pub Value);

pub enum JsonBodyRejection {
    Body(Response),
    Invalid,
}

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Body(response) => response,
            Self::Invalid => ApiError::bad_request("Invalid JSON body", None).into_response(),
        }
    }
}

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| JsonBodyRejection::Body(rejection.into_response()))?;
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|_| JsonBodyRejection::Invalid)
    }
}
