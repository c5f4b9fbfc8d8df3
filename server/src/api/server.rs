//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;

use super::auth::{AuthState, require_api_key};
use super::middleware;
use super::routes::{analytics, health, sessions, traces};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::data::ProjectRepository;
use crate::domain::{AnalyticsService, TraceService};

/// Build the full HTTP router
///
/// `/health` is public; everything under `/v1` requires a project API key.
pub fn router(
    traces: TraceService,
    analytics: AnalyticsService,
    projects: Arc<dyn ProjectRepository>,
) -> Router {
    let v1 = Router::new()
        .merge(traces::routes(traces.clone()))
        .merge(sessions::routes(traces))
        .merge(analytics::routes(analytics))
        .layer(axum::middleware::from_fn_with_state(
            AuthState { projects },
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1)
        .fallback(middleware::handle_404)
        .layer(middleware::trace_layer())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered. Returns CoreApp for graceful shutdown.
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;
        let shutdown = app.shutdown.clone();

        let traces = TraceService::new(Arc::new(Arc::clone(&app.database)));
        let analytics = AnalyticsService::new(
            Arc::new(Arc::clone(&app.database)),
            app.config.analytics.top_models_limit,
        );
        let projects: Arc<dyn ProjectRepository> = Arc::new(Arc::clone(&app.database));
        let router = router(traces, analytics, projects);

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "Pulse server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
