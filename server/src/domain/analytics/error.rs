//! Analytics error taxonomy

use thiserror::Error;

use crate::data::CacheError;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Required fields absent from the submission, in wire order
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid fields: {message}")]
    InvalidFields { fields: Vec<String>, message: String },

    /// Store unreachable, or conflicting writers outlasted the retry budget
    #[error("Store unavailable during {operation} of {key}: {reason}")]
    StoreUnavailable {
        key: String,
        operation: &'static str,
        reason: String,
    },

    #[error("Update of {key} timed out after {timeout_ms}ms")]
    UpstreamTimeout { key: String, timeout_ms: u64 },

    /// The per-delivery record could not be written
    #[error("Failed to persist analytics record {key}: {source}")]
    RecordPersistence {
        key: String,
        #[source]
        source: CacheError,
    },
}

impl AnalyticsError {
    /// Request was rejected before any processing
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingFields(_) | Self::InvalidFields { .. })
    }
}
