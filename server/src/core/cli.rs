use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{CacheBackendType, EvictionPolicy};
use super::constants::{
    APP_NAME_LOWER, ENV_AGGREGATE_TTL_SECS, ENV_CACHE_BACKEND, ENV_CACHE_EVICTION_POLICY,
    ENV_CACHE_MAX_ENTRIES, ENV_CACHE_REDIS_URL, ENV_CONFIG, ENV_HOST, ENV_MAX_MERGE_ATTEMPTS,
    ENV_NOTIFICATIONS_ENABLED, ENV_PORT, ENV_RECORD_TTL_SECS, ENV_UPDATE_TIMEOUT_MS,
};

#[derive(Parser)]
#[command(name = APP_NAME_LOWER)]
#[command(version, about = "Delivery performance analytics service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Store options
    /// Store backend (memory or redis)
    #[arg(long, global = true, env = ENV_CACHE_BACKEND, value_parser = parse_cache_backend_type)]
    pub cache_backend: Option<CacheBackendType>,

    /// Maximum number of entries held by the memory backend
    #[arg(long, global = true, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// Memory backend eviction policy (tinylfu or lru)
    #[arg(long, global = true, env = ENV_CACHE_EVICTION_POLICY, value_parser = parse_eviction_policy)]
    pub cache_eviction_policy: Option<EvictionPolicy>,

    /// Redis-compatible store URL. Supports Redis, Sentinel, Valkey, Dragonfly.
    /// Formats: redis://host:port/db, redis+sentinel://s1:port,s2:port/master/db
    #[arg(long, global = true, env = ENV_CACHE_REDIS_URL)]
    pub cache_redis_url: Option<String>,

    // Analytics options
    /// Delivery record TTL in seconds
    #[arg(long, global = true, env = ENV_RECORD_TTL_SECS)]
    pub record_ttl_secs: Option<u64>,

    /// Driver and platform aggregate TTL in seconds
    #[arg(long, global = true, env = ENV_AGGREGATE_TTL_SECS)]
    pub aggregate_ttl_secs: Option<u64>,

    /// Upper bound for one aggregate update in milliseconds
    #[arg(long, global = true, env = ENV_UPDATE_TIMEOUT_MS)]
    pub update_timeout_ms: Option<u64>,

    /// Optimistic merge attempts per aggregate update
    #[arg(long, global = true, env = ENV_MAX_MERGE_ATTEMPTS)]
    pub max_merge_attempts: Option<u32>,

    /// Enable or disable delivery notifications
    #[arg(long, global = true, env = ENV_NOTIFICATIONS_ENABLED)]
    pub notifications_enabled: Option<bool>,
}

/// Parse cache backend type from CLI/env string
fn parse_cache_backend_type(s: &str) -> Result<CacheBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(CacheBackendType::Memory),
        "redis" => Ok(CacheBackendType::Redis),
        _ => Err(format!(
            "Invalid cache backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

/// Parse eviction policy from CLI/env string
fn parse_eviction_policy(s: &str) -> Result<EvictionPolicy, String> {
    match s.to_lowercase().as_str() {
        "tinylfu" => Ok(EvictionPolicy::TinyLfu),
        "lru" => Ok(EvictionPolicy::Lru),
        _ => Err(format!(
            "Invalid eviction policy '{}'. Valid options: tinylfu, lru",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub cache_backend: Option<CacheBackendType>,
    pub cache_max_entries: Option<u64>,
    pub cache_eviction_policy: Option<EvictionPolicy>,
    pub cache_redis_url: Option<String>,
    pub record_ttl_secs: Option<u64>,
    pub aggregate_ttl_secs: Option<u64>,
    pub update_timeout_ms: Option<u64>,
    pub max_merge_attempts: Option<u32>,
    pub notifications_enabled: Option<bool>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            cache_backend: cli.cache_backend,
            cache_max_entries: cli.cache_max_entries,
            cache_eviction_policy: cli.cache_eviction_policy,
            cache_redis_url: cli.cache_redis_url,
            record_ttl_secs: cli.record_ttl_secs,
            aggregate_ttl_secs: cli.aggregate_ttl_secs,
            update_timeout_ms: cli.update_timeout_ms,
            max_merge_attempts: cli.max_merge_attempts,
            notifications_enabled: cli.notifications_enabled,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_backend_type() {
        assert_eq!(
            parse_cache_backend_type("Redis").unwrap(),
            CacheBackendType::Redis
        );
        assert!(parse_cache_backend_type("memcached").is_err());
    }

    #[test]
    fn test_parse_eviction_policy() {
        assert_eq!(parse_eviction_policy("LRU").unwrap(), EvictionPolicy::Lru);
        assert!(parse_eviction_policy("fifo").is_err());
    }

    #[test]
    fn test_cli_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "delivery-analytics",
            "start",
            "--port",
            "9000",
            "--cache-backend",
            "redis",
            "--cache-redis-url",
            "redis://localhost:6379",
            "--max-merge-attempts",
            "8",
            "--notifications-enabled",
            "false",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Start)));

        let config = CliConfig::from(cli);
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.cache_backend, Some(CacheBackendType::Redis));
        assert_eq!(config.max_merge_attempts, Some(8));
        assert_eq!(config.notifications_enabled, Some(false));
        assert!(config.host.is_none());
    }
}
