//! Delivery performance analytics
//!
//! - `score` - pure performance scoring
//! - `types` - submissions, per-delivery records and running aggregates
//! - `aggregator` - optimistic read-modify-write of aggregates
//! - `service` - ingestion orchestration and queries

mod aggregator;
mod error;
pub mod score;
mod service;
#[cfg(test)]
pub(crate) mod test_support;
mod types;

pub use aggregator::StatsAggregator;
pub use error::AnalyticsError;
pub use service::{AnalyticsService, StoreHealth};
pub use types::{
    AggregateStats, AnalyticsRecord, DeliveryEvent, DeliveryStatus, DeliverySubmission,
    is_valid_id,
};
