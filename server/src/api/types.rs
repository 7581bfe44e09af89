//! Shared API types
//!
//! Every error body has the shape `{"success": false, "code", "error"}`, with
//! an optional list of offending fields for validation failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::AnalyticsError;

/// Error body, documented for OpenAPI
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_fields: Option<Vec<String>>,
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    MissingFields { fields: Vec<String>, message: String },
    InvalidFields { fields: Vec<String>, message: String },
    NotFound { code: String, message: String },
    ServiceUnavailable { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::MissingFields { .. } | Self::InvalidFields { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn into_body(self) -> ErrorBody {
        let (code, error, missing_fields, invalid_fields) = match self {
            Self::BadRequest { code, message } | Self::NotFound { code, message } => {
                (code, message, None, None)
            }
            Self::MissingFields { fields, message } => {
                ("MISSING_FIELDS".to_string(), message, Some(fields), None)
            }
            Self::InvalidFields { fields, message } => {
                ("INVALID_FIELDS".to_string(), message, None, Some(fields))
            }
            Self::ServiceUnavailable { message } => {
                ("SERVICE_UNAVAILABLE".to_string(), message, None, None)
            }
        };
        ErrorBody {
            success: false,
            code,
            error,
            missing_fields,
            invalid_fields,
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        let message = e.to_string();
        match e {
            AnalyticsError::MissingFields(fields) => Self::MissingFields { fields, message },
            AnalyticsError::InvalidFields { fields, message } => {
                Self::InvalidFields { fields, message }
            }
            AnalyticsError::StoreUnavailable { .. }
            | AnalyticsError::UpstreamTimeout { .. }
            | AnalyticsError::RecordPersistence { .. } => {
                tracing::error!(error = %message, "Analytics store error");
                Self::service_unavailable("Analytics store unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}
