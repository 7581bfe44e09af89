//! In-memory store implementation using moka
//!
//! Conditional writes go through moka's per-key `and_compute_with`, which
//! serializes concurrent computations on the same key.
//!
//! Per-delivery records live in a cache bounded by `max_entries`. Aggregates
//! live in a separate cache bounded only by their TTL, so record churn can
//! never evict a driver or platform aggregate inside its window.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use super::backend::{CacheBackend, VersionedBytes};
use super::clock::{Clock, SystemClock};
use super::error::CacheError;
use super::key::CacheKey;
use crate::core::config::{CacheConfig, EvictionPolicy};

/// Cache entry with data and metadata
#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    version: u64,
    ttl: Option<Duration>,
    /// Logical deadline measured on the backend's clock
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Per-entry expiry tracking for variable TTLs
struct VariableTtlExpiry;

impl Expiry<String, CacheEntry> for VariableTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_read(
        &self,
        _key: &String,
        _value: &CacheEntry,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        duration_until_expiry
    }
}

/// In-memory store implementation
///
/// moka evicts entries on wall-clock TTL; reads additionally check the
/// logical deadline so an injected clock can expire entries early.
pub struct InMemoryCache {
    records: Cache<String, CacheEntry>,
    aggregates: Cache<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    /// Source of write versions, shared by every key
    last_version: AtomicU64,
}

impl InMemoryCache {
    /// Create a new in-memory store with the given configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new in-memory store driven by a custom clock
    ///
    /// Note: moka uses TinyLFU eviction regardless of the eviction_policy setting.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        if config.eviction_policy == EvictionPolicy::Lru {
            tracing::debug!(
                "LRU eviction policy selected but moka uses TinyLFU internally. \
                 TinyLFU provides similar recency-based eviction with better hit rates."
            );
        }

        let records = Cache::builder()
            .max_capacity(config.max_entries)
            .initial_capacity((config.max_entries as usize / 4).min(10_000))
            .expire_after(VariableTtlExpiry)
            .build();
        let aggregates = Cache::builder().expire_after(VariableTtlExpiry).build();

        Self {
            records,
            aggregates,
            clock,
            last_version: AtomicU64::new(0),
        }
    }

    fn cache_for(&self, key: &str) -> &Cache<String, CacheEntry> {
        if CacheKey::is_aggregate(key) {
            &self.aggregates
        } else {
            &self.records
        }
    }

    fn deadline(&self, ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|ttl| self.clock.now() + ttl)
    }

    /// Fetch an entry only if it has not logically expired
    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.cache_for(key)
            .get(key)
            .await
            .filter(|entry| entry.is_live(now))
    }

    /// Atomically write when `expected` matches the live version
    ///
    /// `expected == None` writes unconditionally. New versions come from a
    /// backend-wide counter and are never reused, so a reader holding a
    /// version from before an expiry or eviction cannot match a recreated key.
    async fn compute_write(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
        ttl: Option<Duration>,
    ) -> bool {
        let now = self.clock.now();
        let expires_at = self.deadline(ttl);

        let result = self
            .cache_for(key)
            .entry(key.to_string())
            .and_compute_with(|maybe_entry| {
                let live_version = maybe_entry
                    .map(|e| e.into_value())
                    .filter(|e| e.is_live(now))
                    .map_or(0, |e| e.version);

                let op = match expected {
                    Some(expected) if expected != live_version => Op::Nop,
                    _ => Op::Put(CacheEntry {
                        data: value,
                        version: self.last_version.fetch_add(1, Ordering::Relaxed) + 1,
                        ttl,
                        expires_at,
                    }),
                };
                std::future::ready(op)
            })
            .await;

        matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        )
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.compute_write(key, value, None, ttl).await;
        Ok(())
    }

    async fn get_versioned(&self, key: &str) -> Result<Option<VersionedBytes>, CacheError> {
        Ok(self.live_entry(key).await.map(|entry| VersionedBytes {
            data: entry.data,
            version: entry.version,
        }))
    }

    async fn set_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_version: u64,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        Ok(self
            .compute_write(key, value, Some(expected_version), ttl)
            .await)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = self.clock.now();
        Ok(self
            .live_entry(key)
            .await
            .and_then(|entry| entry.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        // In-memory is always healthy
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
