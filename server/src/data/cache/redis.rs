//! Redis-compatible store implementation using deadpool-redis
//!
//! Supports Redis, Redis Sentinel, Valkey and Dragonfly.
//!
//! Every key is a hash with two fields:
//! - `v`: write version (integer, bumped on every write)
//! - `d`: MessagePack payload
//!
//! Writes run as Lua scripts so the version check, the write and the TTL
//! reset happen atomically on the server. A key created from scratch (new or
//! expired) seeds its version from the server clock in milliseconds, so a
//! recreated key never repeats a version handed out before it expired.
//!
//! # URL Formats
//!
//! ```text
//! redis://[user:password@]host:port[/db]
//! rediss://[user:password@]host:port[/db]  (TLS)
//! redis+sentinel://[user:password@]sentinel1:port,sentinel2:port/master_name[/db]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};

use super::backend::{CacheBackend, VersionedBytes};
use super::error::CacheError;
use crate::core::constants::{REDIS_POOL_MAX_SIZE, REDIS_POOL_TIMEOUT_SECS};

const VERSION_FIELD: &str = "v";
const DATA_FIELD: &str = "d";

/// Shared prelude: next version for KEYS[1], seeded from TIME when absent
const NEXT_VERSION_LUA: &str = r#"
    local function next_version(current)
        if current == 0 then
            local t = redis.call('TIME')
            current = tonumber(t[1]) * 1000 + math.floor(tonumber(t[2]) / 1000)
        end
        return string.format('%d', current + 1)
    end
"#;

/// KEYS[1] = key, ARGV[1] = payload, ARGV[2] = ttl in ms (0 = no expiry)
const SET_BODY_LUA: &str = r#"
    local current = tonumber(redis.call('HGET', KEYS[1], 'v') or '0')
    local version = next_version(current)
    redis.call('HSET', KEYS[1], 'v', version, 'd', ARGV[1])
    local ttl = tonumber(ARGV[2])
    if ttl > 0 then
        redis.call('PEXPIRE', KEYS[1], ttl)
    else
        redis.call('PERSIST', KEYS[1])
    end
    return 1
"#;

/// KEYS[1] = key, ARGV[1] = expected version (0 = absent),
/// ARGV[2] = payload, ARGV[3] = ttl in ms (0 = no expiry)
const SET_IF_VERSION_BODY_LUA: &str = r#"
    local current = tonumber(redis.call('HGET', KEYS[1], 'v') or '0')
    if current ~= tonumber(ARGV[1]) then
        return 0
    end
    redis.call('HSET', KEYS[1], 'v', next_version(current), 'd', ARGV[2])
    local ttl = tonumber(ARGV[3])
    if ttl > 0 then
        redis.call('PEXPIRE', KEYS[1], ttl)
    else
        redis.call('PERSIST', KEYS[1])
    end
    return 1
"#;

fn script(body: &str) -> String {
    format!("{NEXT_VERSION_LUA}{body}")
}

/// Redis-compatible store implementation
///
/// Uses connection pooling via deadpool-redis.
pub struct RedisCache {
    pool: Pool,
    backend_type: RedisBackendType,
}

/// Type of Redis-compatible backend being used
#[derive(Debug, Clone, Copy)]
enum RedisBackendType {
    /// Standard Redis or compatible (Valkey, Dragonfly)
    Redis,
    /// Redis Sentinel for high availability
    Sentinel,
}

impl RedisCache {
    /// Connect to a Redis-compatible server and verify it answers PING
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let sanitized_url = sanitize_redis_url(redis_url);
        let backend_type = detect_backend_type(redis_url);

        let timeout = Some(Duration::from_secs(REDIS_POOL_TIMEOUT_SECS));
        let mut config = Config::from_url(redis_url);
        config.pool = Some(deadpool_redis::PoolConfig {
            max_size: REDIS_POOL_MAX_SIZE,
            timeouts: deadpool_redis::Timeouts {
                wait: timeout,
                create: timeout,
                recycle: timeout,
            },
            ..Default::default()
        });
        let pool = config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            let hint = match backend_type {
                RedisBackendType::Sentinel => {
                    " (Sentinel URL format: redis+sentinel://host1:port,host2:port/master_name/db)"
                }
                RedisBackendType::Redis => "",
            };
            CacheError::Connection(format!(
                "Failed to create Redis pool for {sanitized_url}: {e}{hint}"
            ))
        })?;

        let mut conn = pool.get().await.map_err(|e| {
            CacheError::Connection(format!(
                "Failed to get Redis connection from pool for {sanitized_url}: {e}"
            ))
        })?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                CacheError::Connection(format!("Redis PING failed for {sanitized_url}: {e}"))
            })?;

        let cache = Self { pool, backend_type };
        tracing::debug!(
            url = %sanitized_url,
            backend = cache.backend_name(),
            "Redis store connected"
        );
        Ok(cache)
    }
}

/// Detect the backend type from URL scheme
fn detect_backend_type(url: &str) -> RedisBackendType {
    if url.starts_with("redis+sentinel://") || url.starts_with("rediss+sentinel://") {
        RedisBackendType::Sentinel
    } else {
        RedisBackendType::Redis
    }
}

/// Sanitize Redis URL for logging (masks the password)
fn sanitize_redis_url(url: &str) -> String {
    // rfind: passwords may contain '@'
    if let Some(at_pos) = url.rfind('@') {
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':') {
            let abs_colon = scheme_end + colon_pos;
            return format!("{}***{}", &url[..abs_colon + 1], &url[at_pos..]);
        }
    }
    url.to_string()
}

/// TTL in milliseconds for the Lua scripts; 0 means no expiry
///
/// Sub-millisecond TTLs round up to 1ms so they never turn into "forever".
fn ttl_millis(ttl: Option<Duration>) -> u64 {
    ttl.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1))
        .unwrap_or(0)
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let result: Option<Vec<u8>> = conn.hget(key, DATA_FIELD).await?;
        Ok(result)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _: i64 = deadpool_redis::redis::cmd("EVAL")
            .arg(script(SET_BODY_LUA))
            .arg(1)
            .arg(key)
            .arg(value)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_versioned(&self, key: &str) -> Result<Option<VersionedBytes>, CacheError> {
        let mut conn = self.pool.get().await?;
        let (version, data): (Option<u64>, Option<Vec<u8>>) = deadpool_redis::redis::cmd("HMGET")
            .arg(key)
            .arg(VERSION_FIELD)
            .arg(DATA_FIELD)
            .query_async(&mut conn)
            .await?;

        match (version, data) {
            (Some(version), Some(data)) => Ok(Some(VersionedBytes { data, version })),
            (None, None) => Ok(None),
            _ => Err(CacheError::Operation(format!(
                "Malformed versioned record at key {key}"
            ))),
        }
    }

    async fn set_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_version: u64,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let mut conn = self.pool.get().await?;
        let written: i64 = deadpool_redis::redis::cmd("EVAL")
            .arg(script(SET_IF_VERSION_BODY_LUA))
            .arg(1)
            .arg(key)
            .arg(expected_version)
            .arg(value)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(written == 1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let mut conn = self.pool.get().await?;
        let ttl_ms: i64 = deadpool_redis::redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        // -2: missing key, -1: no expiry
        match ttl_ms {
            n if n > 0 => Ok(Some(Duration::from_millis(n as u64))),
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        match self.backend_type {
            RedisBackendType::Redis => "redis",
            RedisBackendType::Sentinel => "redis-sentinel",
        }
    }
}
