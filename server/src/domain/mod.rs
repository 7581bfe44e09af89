//! Domain logic for delivery analytics
//!
//! - `analytics` - scoring, aggregate merging and ingestion
//! - `notify` - order completion notifications

pub mod analytics;
pub mod notify;

pub use analytics::{AnalyticsError, AnalyticsService};
pub use notify::{LogNotifier, NotificationSink};
