//! Deliveries API types

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::analytics::AnalyticsRecord;

/// Message returned with every successfully processed submission
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Delivery analytics calculated successfully";

/// Response for a processed delivery submission
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitDeliveryResponse {
    pub success: bool,
    pub data: AnalyticsRecord,
    pub message: &'static str,
}

impl SubmitDeliveryResponse {
    pub fn new(data: AnalyticsRecord) -> Self {
        Self {
            success: true,
            data,
            message: SUBMIT_SUCCESS_MESSAGE,
        }
    }
}

/// Response for a stored delivery record lookup
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryRecordResponse {
    pub success: bool,
    pub data: AnalyticsRecord,
}
