use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_AGGREGATE_TTL_SECS, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_HOST, DEFAULT_MAX_MERGE_ATTEMPTS, DEFAULT_PORT, DEFAULT_RECORD_TTL_SECS,
    DEFAULT_UPDATE_TIMEOUT_MS,
};

// =============================================================================
// Cache Backend Enum
// =============================================================================

/// Cache backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackendType::Memory => write!(f, "memory"),
            CacheBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// Eviction Policy Enum
// =============================================================================

/// Cache eviction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// TinyLFU - LRU eviction + LFU admission (near-optimal hit ratio)
    #[default]
    TinyLfu,
    /// Simple LRU (better for recency-biased workloads)
    Lru,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::TinyLfu => write!(f, "tinylfu"),
            EvictionPolicy::Lru => write!(f, "lru"),
        }
    }
}

// =============================================================================
// File Config Structs (all fields optional, merged across sources)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Cache configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub backend: Option<CacheBackendType>,
    /// Maximum number of entries (memory backend)
    pub max_entries: Option<u64>,
    pub eviction_policy: Option<EvictionPolicy>,
    /// Connection URL for Redis-compatible backends
    pub redis_url: Option<String>,
}

/// Analytics configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AnalyticsFileConfig {
    pub record_ttl_secs: Option<u64>,
    pub aggregate_ttl_secs: Option<u64>,
    pub update_timeout_ms: Option<u64>,
    pub max_merge_attempts: Option<u32>,
}

/// Notification configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NotificationsFileConfig {
    pub enabled: Option<bool>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub cache: Option<CacheFileConfig>,
    pub analytics: Option<AnalyticsFileConfig>,
    pub notifications: Option<NotificationsFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if let Some(cache) = other.cache {
            let current = self.cache.get_or_insert_with(CacheFileConfig::default);
            if cache.backend.is_some() {
                tracing::trace!(backend = ?cache.backend, "Merging cache.backend");
                current.backend = cache.backend;
            }
            if cache.max_entries.is_some() {
                current.max_entries = cache.max_entries;
            }
            if cache.eviction_policy.is_some() {
                current.eviction_policy = cache.eviction_policy;
            }
            if cache.redis_url.is_some() {
                current.redis_url = cache.redis_url;
            }
        }

        if let Some(analytics) = other.analytics {
            let current = self
                .analytics
                .get_or_insert_with(AnalyticsFileConfig::default);
            if analytics.record_ttl_secs.is_some() {
                current.record_ttl_secs = analytics.record_ttl_secs;
            }
            if analytics.aggregate_ttl_secs.is_some() {
                current.aggregate_ttl_secs = analytics.aggregate_ttl_secs;
            }
            if analytics.update_timeout_ms.is_some() {
                current.update_timeout_ms = analytics.update_timeout_ms;
            }
            if analytics.max_merge_attempts.is_some() {
                current.max_merge_attempts = analytics.max_merge_attempts;
            }
        }

        if let Some(notifications) = other.notifications {
            let current = self
                .notifications
                .get_or_insert_with(NotificationsFileConfig::default);
            if notifications.enabled.is_some() {
                current.enabled = notifications.enabled;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Cache configuration (used internally by CacheService)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackendType,
    /// Maximum entries (memory backend)
    pub max_entries: u64,
    /// Eviction policy (memory backend)
    pub eviction_policy: EvictionPolicy,
    /// Redis URL (redis backend)
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendType::Memory,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            eviction_policy: EvictionPolicy::TinyLfu,
            redis_url: None,
        }
    }
}

/// Analytics tuning (TTLs and aggregate merge bounds)
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// TTL of the per-delivery analytics record
    pub record_ttl: Duration,
    /// TTL of driver and platform aggregates, reset on every write
    pub aggregate_ttl: Duration,
    /// Upper bound for one aggregate merge including retries
    pub update_timeout: Duration,
    /// Optimistic merge attempts before the update is abandoned
    pub max_merge_attempts: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            record_ttl: Duration::from_secs(DEFAULT_RECORD_TTL_SECS),
            aggregate_ttl: Duration::from_secs(DEFAULT_AGGREGATE_TTL_SECS),
            update_timeout: Duration::from_millis(DEFAULT_UPDATE_TIMEOUT_MS),
            max_merge_attempts: DEFAULT_MAX_MERGE_ATTEMPTS,
        }
    }
}

/// Notification sink configuration
#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    pub enabled: bool,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub analytics: AnalyticsConfig,
    pub notifications: NotificationsConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.delivery-analytics/delivery-analytics.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            cache_backend = %config.cache.backend,
            cache_max_entries = config.cache.max_entries,
            record_ttl_secs = config.analytics.record_ttl.as_secs(),
            aggregate_ttl_secs = config.analytics.aggregate_ttl.as_secs(),
            update_timeout_ms = config.analytics.update_timeout.as_millis() as u64,
            max_merge_attempts = config.analytics.max_merge_attempts,
            notifications_enabled = config.notifications.enabled,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_cache = file_config.cache.unwrap_or_default();
        let file_analytics = file_config.analytics.unwrap_or_default();
        let file_notifications = file_config.notifications.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let cache_backend = cli.cache_backend.or(file_cache.backend).unwrap_or_default();
        let cache = CacheConfig {
            backend: cache_backend,
            max_entries: cli
                .cache_max_entries
                .or(file_cache.max_entries)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            eviction_policy: cli
                .cache_eviction_policy
                .or(file_cache.eviction_policy)
                .unwrap_or_default(),
            // Only carried through when the redis backend is selected
            redis_url: if cache_backend == CacheBackendType::Redis {
                cli.cache_redis_url.clone().or(file_cache.redis_url)
            } else {
                None
            },
        };

        let analytics = AnalyticsConfig {
            record_ttl: Duration::from_secs(
                cli.record_ttl_secs
                    .or(file_analytics.record_ttl_secs)
                    .unwrap_or(DEFAULT_RECORD_TTL_SECS),
            ),
            aggregate_ttl: Duration::from_secs(
                cli.aggregate_ttl_secs
                    .or(file_analytics.aggregate_ttl_secs)
                    .unwrap_or(DEFAULT_AGGREGATE_TTL_SECS),
            ),
            update_timeout: Duration::from_millis(
                cli.update_timeout_ms
                    .or(file_analytics.update_timeout_ms)
                    .unwrap_or(DEFAULT_UPDATE_TIMEOUT_MS),
            ),
            max_merge_attempts: cli
                .max_merge_attempts
                .or(file_analytics.max_merge_attempts)
                .unwrap_or(DEFAULT_MAX_MERGE_ATTEMPTS),
        };

        let notifications = NotificationsConfig {
            enabled: cli
                .notifications_enabled
                .or(file_notifications.enabled)
                .unwrap_or(true),
        };

        Self {
            server: ServerConfig { host, port },
            cache,
            analytics,
            notifications,
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        if self.cache.backend == CacheBackendType::Redis
            && self.cache.redis_url.as_deref().is_none_or(str::is_empty)
        {
            anyhow::bail!("Configuration error: cache.redis_url is required for the redis backend");
        }
        if self.cache.max_entries == 0 {
            anyhow::bail!("Configuration error: cache.max_entries must be greater than 0");
        }
        if self.analytics.record_ttl.is_zero() || self.analytics.aggregate_ttl.is_zero() {
            anyhow::bail!("Configuration error: analytics TTLs must be greater than 0");
        }
        if self.analytics.update_timeout.is_zero() {
            anyhow::bail!("Configuration error: analytics.update_timeout_ms must be greater than 0");
        }
        if self.analytics.max_merge_attempts == 0 {
            anyhow::bail!(
                "Configuration error: analytics.max_merge_attempts must be greater than 0"
            );
        }
        Ok(())
    }
}

/// Get the profile config path (~/.delivery-analytics/delivery-analytics.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
