//! Aggregate statistics endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedQuery;
use crate::api::types::{ApiError, ErrorBody};
use crate::domain::AnalyticsService;
use crate::domain::analytics::AggregateStats;

/// Shared state for Stats API endpoints
#[derive(Clone)]
pub struct StatsApiState {
    pub analytics: Arc<AnalyticsService>,
}

/// Build Stats API routes
pub fn routes(analytics: Arc<AnalyticsService>) -> Router<()> {
    let state = StatsApiState { analytics };

    Router::new()
        .route("/api/v1/stats/{stat_type}", get(get_stats))
        .with_state(state)
}

/// Which aggregate a stats request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatType {
    Platform,
    Driver,
}

fn parse_stat_type(s: &str) -> Result<StatType, ApiError> {
    match s {
        "platform" => Ok(StatType::Platform),
        "driver" => Ok(StatType::Driver),
        other => Err(ApiError::bad_request(
            "UNKNOWN_STAT_TYPE",
            format!("Unknown stat type: {other}"),
        )),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    /// Driver to look up (required for the `driver` stat type)
    #[validate(length(max = 256, message = "driverId must be at most 256 characters"))]
    pub driver_id: Option<String>,
}

/// Aggregate statistics response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub data: AggregateStats,
}

/// Get platform or per-driver aggregate statistics
#[utoipa::path(
    get,
    path = "/api/v1/stats/{stat_type}",
    tag = "stats",
    params(
        ("stat_type" = String, Path, description = "Stat type (platform, driver)"),
        ("driverId" = Option<String>, Query, description = "Driver ID (required for driver stats)")
    ),
    responses(
        (status = 200, description = "Aggregate statistics", body = StatsResponse),
        (status = 400, description = "Unknown stat type or missing driverId", body = ErrorBody),
        (status = 404, description = "Statistics not found", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn get_stats(
    State(state): State<StatsApiState>,
    Path(stat_type): Path<String>,
    query: ValidatedQuery<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = match parse_stat_type(&stat_type)? {
        StatType::Platform => state.analytics.platform_stats().await?,
        StatType::Driver => {
            let driver_id = query
                .driver_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    ApiError::bad_request("MISSING_DRIVER_ID", "driverId parameter required")
                })?;
            state.analytics.driver_stats(driver_id).await?
        }
    };

    let stats =
        stats.ok_or_else(|| ApiError::not_found("NOT_FOUND", "Statistics not found"))?;

    Ok(Json(StatsResponse {
        success: true,
        data: stats,
    }))
}
