//! Delivery submission and lookup endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use types::{DeliveryRecordResponse, SubmitDeliveryResponse};

use crate::api::extractors::{ApiJson, DeliveryPath};
use crate::api::types::{ApiError, ErrorBody};
use crate::domain::AnalyticsService;
use crate::domain::analytics::DeliverySubmission;

/// Shared state for Deliveries API endpoints
#[derive(Clone)]
pub struct DeliveriesApiState {
    pub analytics: Arc<AnalyticsService>,
}

/// Build Deliveries API routes
pub fn routes(analytics: Arc<AnalyticsService>) -> Router<()> {
    let state = DeliveriesApiState { analytics };

    Router::new()
        .route("/api/v1/deliveries", post(submit_delivery))
        .route("/api/v1/deliveries/{delivery_id}", get(get_delivery))
        .with_state(state)
}

/// Submit a completed delivery for scoring and aggregation
#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    tag = "deliveries",
    request_body = DeliverySubmission,
    responses(
        (status = 200, description = "Delivery analytics calculated", body = SubmitDeliveryResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 503, description = "Analytics record could not be stored", body = ErrorBody)
    )
)]
pub async fn submit_delivery(
    State(state): State<DeliveriesApiState>,
    ApiJson(submission): ApiJson<DeliverySubmission>,
) -> Result<Json<SubmitDeliveryResponse>, ApiError> {
    let record = state.analytics.ingest(submission).await?;
    Ok(Json(SubmitDeliveryResponse::new(record)))
}

/// Get stored analytics for one delivery
#[utoipa::path(
    get,
    path = "/api/v1/deliveries/{delivery_id}",
    tag = "deliveries",
    params(
        ("delivery_id" = String, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Stored delivery analytics", body = DeliveryRecordResponse),
        (status = 404, description = "No analytics stored for this delivery", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn get_delivery(
    State(state): State<DeliveriesApiState>,
    path: DeliveryPath,
) -> Result<Json<DeliveryRecordResponse>, ApiError> {
    let record = state
        .analytics
        .delivery_record(&path.delivery_id)
        .await?
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", "Delivery analytics not found"))?;

    Ok(Json(DeliveryRecordResponse {
        success: true,
        data: record,
    }))
}
