//! HTTP middleware (request spans, 404 handler)

use axum::Json;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::Span;

use super::types::ErrorBody;

/// Span for one HTTP request, tagged with a fresh request id
pub fn request_span(req: &Request) -> Span {
    tracing::info_span!(
        "http_request",
        request_id = %uuid::Uuid::new_v4(),
        method = %req.method(),
        uri = %req.uri(),
    )
}

const MAX_404_BODY_LOG: usize = 64 * 1024; // 64KB limit for logging

fn not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "ROUTE_NOT_FOUND".to_string(),
            error: "Route not found".to_string(),
            missing_fields: None,
            invalid_fields: None,
        }),
    )
        .into_response()
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> Response {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return not_found_response();
    }

    let method = req.method().clone();
    let uri = req.uri().clone();

    let body_bytes = match to_bytes(req.into_body(), MAX_404_BODY_LOG).await {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::debug!("[404] {} {} (failed to read body)", method, uri);
            return not_found_response();
        }
    };

    let body_value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            String::from_utf8(body_bytes.to_vec())
                .map(serde_json::Value::String)
                .unwrap_or_else(|_| {
                    serde_json::Value::String(format!("<binary {} bytes>", body_bytes.len()))
                })
        })
    };

    tracing::debug!(
        method = %method,
        uri = %uri,
        body = %body_value,
        "[404] No route matched"
    );

    not_found_response()
}
