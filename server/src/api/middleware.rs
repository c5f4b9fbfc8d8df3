//! HTTP middleware (request logging, 404 handler)

use axum::extract::Request;
use axum::http::Uri;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::types::ApiError;

/// Request/response logging at DEBUG, server errors at ERROR
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}

/// Fallback for unknown routes
pub async fn handle_404(uri: Uri, request: Request) -> ApiError {
    tracing::debug!(method = %request.method(), %uri, "No route");
    ApiError::not_found("Not found")
}
