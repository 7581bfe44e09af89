// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Delivery Analytics";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "delivery-analytics";

/// Crate name used as the default log target
pub const APP_LOG_TARGET: &str = "delivery_analytics";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".delivery-analytics";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "delivery-analytics.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "DELIVERY_ANALYTICS_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "DELIVERY_ANALYTICS_LOG";

/// Environment variable for log output format (`compact` or `json`)
pub const ENV_LOG_FORMAT: &str = "DELIVERY_ANALYTICS_LOG_FORMAT";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "DELIVERY_ANALYTICS_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "DELIVERY_ANALYTICS_PORT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default request body limit (delivery events are tiny)
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Environment Variables - Cache
// =============================================================================

pub const ENV_CACHE_BACKEND: &str = "DELIVERY_ANALYTICS_CACHE_BACKEND";
pub const ENV_CACHE_MAX_ENTRIES: &str = "DELIVERY_ANALYTICS_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_EVICTION_POLICY: &str = "DELIVERY_ANALYTICS_CACHE_EVICTION_POLICY";
pub const ENV_CACHE_REDIS_URL: &str = "DELIVERY_ANALYTICS_REDIS_URL";

// =============================================================================
// Cache Defaults
// =============================================================================

/// Default maximum entries for the in-memory backend
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100_000;

/// Version prefix for every store key.
///
/// Bump to orphan all stored records after a schema change.
pub const CACHE_KEY_VERSION: &str = "v1";

/// Interval between background store health checks
pub const STORE_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

/// Redis pool size
pub const REDIS_POOL_MAX_SIZE: usize = 32;

/// Redis pool wait/create/recycle timeout
pub const REDIS_POOL_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Environment Variables - Analytics
// =============================================================================

pub const ENV_RECORD_TTL_SECS: &str = "DELIVERY_ANALYTICS_RECORD_TTL_SECS";
pub const ENV_AGGREGATE_TTL_SECS: &str = "DELIVERY_ANALYTICS_AGGREGATE_TTL_SECS";
pub const ENV_UPDATE_TIMEOUT_MS: &str = "DELIVERY_ANALYTICS_UPDATE_TIMEOUT_MS";
pub const ENV_MAX_MERGE_ATTEMPTS: &str = "DELIVERY_ANALYTICS_MAX_MERGE_ATTEMPTS";
pub const ENV_NOTIFICATIONS_ENABLED: &str = "DELIVERY_ANALYTICS_NOTIFICATIONS_ENABLED";

// =============================================================================
// Analytics Defaults
// =============================================================================

/// Per-delivery analytics record TTL (24 hours)
pub const DEFAULT_RECORD_TTL_SECS: u64 = 86_400;

/// Driver and platform aggregate TTL (7 days), reset on every write
pub const DEFAULT_AGGREGATE_TTL_SECS: u64 = 604_800;

/// Upper bound for a single aggregate merge, including retries
pub const DEFAULT_UPDATE_TIMEOUT_MS: u64 = 1_500;

/// Optimistic merge attempts before giving up on an aggregate update
pub const DEFAULT_MAX_MERGE_ATTEMPTS: u32 = 5;

/// Base delay between optimistic merge attempts
pub const MERGE_RETRY_BASE_DELAY_MS: u64 = 5;

/// Store key suffix for the platform-wide aggregate
pub const PLATFORM_STATS_ID: &str = "deliveries";

/// Upper bound on delivery, order and driver identifiers
pub const MAX_ID_LENGTH: usize = 256;

/// Performance score for an on-time (or early) delivery
pub const MAX_PERFORMANCE_SCORE: u32 = 100;
