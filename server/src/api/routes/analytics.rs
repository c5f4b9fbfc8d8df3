//! Analytics endpoint

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::api::auth::ProjectId;
use crate::api::extractors::ValidatedQuery;
use crate::api::types::ApiError;
use crate::data::types::{DateRange, GroupBy};
use crate::domain::traces::validate_timestamp;
use crate::domain::{AnalyticsQuery, AnalyticsService};
use crate::utils::time::parse_rfc3339;

pub fn routes(analytics: AnalyticsService) -> Router<()> {
    Router::new()
        .route("/analytics", get(get_analytics))
        .with_state(analytics)
}

fn validate_group_by(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<GroupBy>()
        .map(|_| ())
        .map_err(|message| ValidationError::new("group_by").with_message(message.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyticsParams {
    #[validate(custom(function = "validate_timestamp"))]
    pub date_from: String,
    #[validate(custom(function = "validate_timestamp"))]
    pub date_to: String,
    #[validate(custom(function = "validate_group_by"))]
    pub group_by: Option<String>,
    pub include_latency: Option<bool>,
}

impl AnalyticsParams {
    fn to_query(&self) -> Result<AnalyticsQuery, ApiError> {
        let parse = |field: &str, value: &str| {
            parse_rfc3339(value).ok_or_else(|| {
                ApiError::invalid_query(vec![(field.to_string(), "Invalid datetime".to_string())])
            })
        };
        let group_by = match self.group_by.as_deref() {
            Some(value) => value
                .parse()
                .map_err(|message| ApiError::invalid_query(vec![("group_by".to_string(), message)]))?,
            None => GroupBy::default(),
        };
        Ok(AnalyticsQuery {
            range: DateRange {
                from: parse("date_from", &self.date_from)?,
                to: parse("date_to", &self.date_to)?,
            },
            group_by,
            include_latency: self.include_latency.unwrap_or(false),
        })
    }
}

/// GET /v1/analytics
pub async fn get_analytics(
    State(analytics): State<AnalyticsService>,
    Extension(ProjectId(project_id)): Extension<ProjectId>,
    ValidatedQuery(params): ValidatedQuery<AnalyticsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = analytics.analyze(&project_id, params.to_query()?).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::api::testing::{TestApi, read_json, trace_json};

    const RANGE: &str = "date_from=2025-01-15T00:00:00Z&date_to=2025-01-15T23:59:59Z";

    #[tokio::test]
    async fn test_error_rate_and_latency() {
        let api = TestApi::new().await;
        let batch: Vec<Value> = (0..20)
            .map(|i| {
                let mut trace = trace_json(i);
                trace["latency_ms"] = json!(100 * (i + 1));
                if i == 0 {
                    trace["status"] = json!("error");
                    trace["error"] = json!({"message": "rate limited"});
                }
                trace
            })
            .collect();
        let response = api
            .router()
            .oneshot(api.post("/v1/traces/batch", &Value::Array(batch)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = api
            .router()
            .oneshot(api.get(&format!("/v1/analytics?{RANGE}&include_latency=true")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["totalRequests"], 20);
        assert_eq!(body["errorRate"].as_f64(), Some(5.0));
        assert_eq!(body["latencyPercentiles"]["p50"].as_f64(), Some(1050.0));
        assert!(body["latencyDistribution"].is_array());
        assert_eq!(body["costOverTime"][0]["period"], "2025-01-15T00:00:00Z");
    }

    #[tokio::test]
    async fn test_oversized_token_count_rejected_and_analytics_stays_up() {
        let api = TestApi::new().await;
        let mut huge = trace_json(1);
        huge["input_tokens"] = json!(u64::MAX);
        let response = api
            .router()
            .oneshot(api.post("/v1/traces/batch", &json!([huge, trace_json(2)])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["details"][0]["path"], "[0].input_tokens");

        let response = api
            .router()
            .oneshot(api.post("/v1/traces/batch", &json!([trace_json(3)])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = api
            .router()
            .oneshot(api.get(&format!("/v1/analytics?{RANGE}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["totalRequests"], 1);
        assert_eq!(body["totalTokens"]["input"], 100);
    }

    #[tokio::test]
    async fn test_latency_omitted_by_default() {
        let api = TestApi::new().await;
        let response = api
            .router()
            .oneshot(api.get(&format!("/v1/analytics?{RANGE}&group_by=model")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["totalRequests"], 0);
        assert!(body.get("latencyPercentiles").is_none());
        assert!(body.get("latencyDistribution").is_none());
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let api = TestApi::new().await;
        for uri in [
            "/v1/analytics".to_string(),
            "/v1/analytics?date_from=2025-01-15T00:00:00Z".to_string(),
            "/v1/analytics?date_from=yesterday&date_to=2025-01-15T00:00:00Z".to_string(),
            format!("/v1/analytics?{RANGE}&group_by=week"),
            "/v1/analytics?date_from=2025-01-16T00:00:00Z&date_to=2025-01-15T00:00:00Z".to_string(),
        ] {
            let response = api.router().oneshot(api.get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(read_json(response).await["error"], "Invalid query parameters");
        }
    }
}
