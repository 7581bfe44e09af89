//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::openapi::openapi_json;
use super::routes::{deliveries, health, stats};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::domain::{AnalyticsService, NotificationSink};

/// Build the full HTTP router
pub fn router(analytics: Arc<AnalyticsService>, notifier: Arc<dyn NotificationSink>) -> Router {
    Router::new()
        .route("/api/openapi.json", get(openapi_json))
        .merge(health::routes(analytics.clone(), notifier))
        .merge(deliveries::routes(analytics.clone()))
        .merge(stats::routes(analytics))
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(
            host.parse()
                .with_context(|| format!("Invalid bind address: {host}"))?,
            port,
        );

        let router = router(app.analytics.clone(), app.notifier.clone());

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!(%addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::debug!("HTTP server stopped");
        Ok(app)
    }
}
