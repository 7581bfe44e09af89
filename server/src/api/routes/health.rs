//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AnalyticsService, NotificationSink};

/// Shared state for the health endpoint
#[derive(Clone)]
pub struct HealthApiState {
    pub analytics: Arc<AnalyticsService>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Build health route
pub fn routes(analytics: Arc<AnalyticsService>, notifier: Arc<dyn NotificationSink>) -> Router<()> {
    Router::new()
        .route("/api/v1/health", get(health))
        .with_state(HealthApiState {
            analytics,
            notifier,
        })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub store: &'static str,
    pub backend: &'static str,
    pub notifications: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<HealthApiState>) -> impl IntoResponse {
    let store = state.analytics.health().await;
    let (status_code, status, store_state) = if store.connected {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            timestamp: Utc::now(),
            store: store_state,
            backend: store.backend,
            notifications: state.notifier.mode(),
            version: env!("CARGO_PKG_VERSION"),
            error: store.error,
        }),
    )
}
