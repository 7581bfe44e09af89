//! Key-value store module
//!
//! Provides TTL-aware storage with pluggable backends:
//! - In-memory (default) - uses moka
//! - Redis (optional) - uses deadpool-redis
//!
//! On top of plain get/set, every backend supports versioned reads and
//! compare-and-set writes, used for lock-free read-modify-write of aggregates.

mod backend;
pub mod clock;
mod error;
mod key;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use backend::{CacheBackend, VersionedBytes};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use key::CacheKey;

use memory::InMemoryCache;

use crate::core::config::{CacheBackendType, CacheConfig};
use crate::core::constants::STORE_HEALTH_CHECK_INTERVAL_SECS;

/// A decoded value with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Store service providing typed access to the backend
///
/// Values are serialized as MessagePack with field names, so structs with
/// skipped optional fields round-trip.
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a new store service from configuration
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendType::Memory => {
                tracing::debug!(
                    max_entries = config.max_entries,
                    eviction_policy = ?config.eviction_policy,
                    "Initializing in-memory store"
                );
                Arc::new(InMemoryCache::new(config))
            }
            CacheBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    CacheError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisCache::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    /// In-memory store driven by a custom clock
    pub fn in_memory_with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_backend(Arc::new(InMemoryCache::with_clock(config, clock)))
    }

    /// Wrap an existing backend
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // =========================================================================
    // Typed API (serde)
    // =========================================================================

    /// Get a typed value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value, replacing whatever was there
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.backend.set(key, encode(value)?, ttl).await
    }

    /// Get a typed value together with its version
    pub async fn get_versioned<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Versioned<T>>, CacheError> {
        match self.backend.get_versioned(key).await? {
            Some(entry) => Ok(Some(Versioned {
                value: decode(&entry.data)?,
                version: entry.version,
            })),
            None => Ok(None),
        }
    }

    /// Write a typed value only if the key is still at `expected_version`
    ///
    /// Use `0` for a key that was absent when read.
    pub async fn set_if_version<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expected_version: u64,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        self.backend
            .set_if_version(key, encode(value)?, expected_version, ttl)
            .await
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Get TTL remaining for a key
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.backend.ttl(key).await
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }

    /// Periodically probe the backend until shutdown
    pub fn start_health_check_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(STORE_HEALTH_CHECK_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Store health check task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = cache.health_check().await {
                            tracing::warn!(
                                backend = cache.backend_name(),
                                error = %e,
                                "Store health check failed"
                            );
                        }
                    }
                }
            }
        })
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    rmp_serde::to_vec_named(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    rmp_serde::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EvictionPolicy;

    fn test_config() -> CacheConfig {
        CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            eviction_policy: EvictionPolicy::TinyLfu,
            redis_url: None,
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Tally {
        count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    }

    #[tokio::test]
    async fn test_cache_service_backend_name() {
        let service = CacheService::new(&test_config()).await.unwrap();
        assert_eq!(service.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_redis_backend_without_url_fails() {
        let config = CacheConfig {
            backend: CacheBackendType::Redis,
            ..test_config()
        };
        let err = CacheService::new(&config).await.unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[tokio::test]
    async fn test_typed_get_set_with_skipped_field() {
        let service = CacheService::new(&test_config()).await.unwrap();
        let tally = Tally {
            count: 3,
            label: None,
        };

        service.set("tally:1", &tally, None).await.unwrap();
        let fetched: Option<Tally> = service.get("tally:1").await.unwrap();
        assert_eq!(fetched, Some(tally));
    }

    #[tokio::test]
    async fn test_versioned_compare_and_set() {
        let service = CacheService::new(&test_config()).await.unwrap();
        let first = Tally {
            count: 1,
            label: Some("a".to_string()),
        };

        assert!(service
            .set_if_version("tally:2", &first, 0, None)
            .await
            .unwrap());

        let read: Versioned<Tally> = service.get_versioned("tally:2").await.unwrap().unwrap();
        assert_eq!(read.value, first);
        assert_eq!(read.version, 1);

        let second = Tally {
            count: 2,
            label: None,
        };
        assert!(service
            .set_if_version("tally:2", &second, read.version, None)
            .await
            .unwrap());
        assert!(!service
            .set_if_version("tally:2", &first, read.version, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_decode_mismatch_is_serialization_error() {
        let service = CacheService::new(&test_config()).await.unwrap();
        service.set("k", &"just a string", None).await.unwrap();

        let err = service.get::<Tally>("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_ttl_with_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let service = CacheService::in_memory_with_clock(&test_config(), clock.clone());

        service
            .set("k", &1u32, Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert_eq!(
            service.ttl("k").await.unwrap(),
            Some(Duration::from_secs(30))
        );

        clock.advance(Duration::from_secs(31));
        assert_eq!(service.get::<u32>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_health_check_task_stops_on_shutdown() {
        let service = Arc::new(CacheService::new(&test_config()).await.unwrap());
        let (tx, rx) = watch::channel(false);

        let handle = service.start_health_check_task(rx);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
