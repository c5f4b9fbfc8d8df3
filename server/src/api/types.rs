//! Shared API types
//!
//! Every error response has the shape `{"error": "...", "details": ...}`,
//! with `details` omitted when there is nothing more to say.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::data::DataError;
use crate::domain::{AnalyticsError, TraceServiceError};

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    Unauthorized {
        message: String,
    },
    NotFound {
        message: String,
    },
    Conflict {
        message: String,
    },
    Internal {
        message: String,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Bad query string, with one `{path, message}` detail per problem
    pub fn invalid_query(details: Vec<(String, String)>) -> Self {
        let details = details
            .into_iter()
            .map(|(path, message)| json!({ "path": path, "message": message }))
            .collect();
        Self::bad_request("Invalid query parameters", Some(Value::Array(details)))
    }

    /// Duplicate keys become 409; anything else is logged and hidden behind a 500
    pub fn from_data(e: DataError) -> Self {
        match e {
            DataError::Conflict(message) => Self::Conflict { message },
            other => {
                tracing::error!(error = %other, "Data error");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<DataError> for ApiError {
    fn from(e: DataError) -> Self {
        Self::from_data(e)
    }
}

impl From<TraceServiceError> for ApiError {
    fn from(e: TraceServiceError) -> Self {
        match e {
            TraceServiceError::Validation(details) => Self::bad_request(
                "Validation failed",
                serde_json::to_value(details).ok(),
            ),
            TraceServiceError::Data(e) => Self::from_data(e),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::InvalidRange => Self::invalid_query(vec![(
                "date_from".to_string(),
                AnalyticsError::InvalidRange.to_string(),
            )]),
            AnalyticsError::Data(e) => Self::from_data(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            Self::BadRequest { message, details } => (StatusCode::BAD_REQUEST, message, details),
            Self::Unauthorized { message } => (StatusCode::UNAUTHORIZED, message, None),
            Self::NotFound { message } => (StatusCode::NOT_FOUND, message, None),
            Self::Conflict { message } => (StatusCode::CONFLICT, message, None),
            Self::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message, None),
        };

        let body = match details {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_has_no_details() {
        let response = ApiError::not_found("Trace not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({"error": "Trace not found"}));
    }

    #[tokio::test]
    async fn test_conflict_maps_to_409() {
        let response = ApiError::from_data(DataError::Conflict("Trace x already exists".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_hides_cause() {
        let response = ApiError::from_data(DataError::Decode("bad json".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Internal server error"})
        );
    }

    #[tokio::test]
    async fn test_invalid_query_details() {
        let response =
            ApiError::invalid_query(vec![("limit".into(), "too big".into())]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Invalid query parameters",
                "details": [{"path": "limit", "message": "too big"}]
            })
        );
    }
}
