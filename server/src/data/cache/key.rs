//! Type-safe store key builder with versioning

use crate::core::constants::{CACHE_KEY_VERSION, PLATFORM_STATS_ID};

/// Type-safe store key builder
///
/// All keys are prefixed with a version (e.g., "v1:") to allow
/// orphaning all stored data on schema changes.
pub struct CacheKey;

const DELIVERY_ANALYTICS: &str = "delivery_analytics";
const DRIVER_STATS: &str = "driver_stats";
const PLATFORM_STATS: &str = "platform_stats";

impl CacheKey {
    /// Per-delivery analytics record
    pub fn delivery_analytics(delivery_id: &str) -> String {
        format!("{}:{}:{}", CACHE_KEY_VERSION, DELIVERY_ANALYTICS, delivery_id)
    }

    /// Per-driver aggregate
    pub fn driver_stats(driver_id: &str) -> String {
        format!("{}:{}:{}", CACHE_KEY_VERSION, DRIVER_STATS, driver_id)
    }

    /// Platform-wide aggregate (single key)
    pub fn platform_stats() -> String {
        format!("{}:{}:{}", CACHE_KEY_VERSION, PLATFORM_STATS, PLATFORM_STATS_ID)
    }

    /// Whether `key` names a running aggregate rather than a per-delivery record
    pub fn is_aggregate(key: &str) -> bool {
        matches!(key.split(':').nth(1), Some(DRIVER_STATS | PLATFORM_STATS))
    }
}
