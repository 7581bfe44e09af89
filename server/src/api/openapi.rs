//! OpenAPI specification

use axum::http::header;
use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{deliveries, health, stats};
use crate::api::types::ErrorBody;
use crate::domain::analytics::{
    AggregateStats, AnalyticsRecord, DeliveryStatus, DeliverySubmission,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Delivery Analytics API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Delivery performance scoring and aggregate statistics"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "deliveries", description = "Delivery submission and lookup"),
        (name = "stats", description = "Platform and driver aggregates")
    ),
    paths(
        health::health,
        deliveries::submit_delivery,
        deliveries::get_delivery,
        stats::get_stats,
    ),
    components(schemas(
        ErrorBody,
        health::HealthResponse,
        DeliverySubmission,
        DeliveryStatus,
        AnalyticsRecord,
        AggregateStats,
        deliveries::types::SubmitDeliveryResponse,
        deliveries::types::DeliveryRecordResponse,
        stats::StatsResponse,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}
