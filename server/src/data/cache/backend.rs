//! Store backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Raw value together with its write version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBytes {
    pub data: Vec<u8>,
    /// Monotonic per-key write counter, never 0 for a present entry
    pub version: u64,
}

/// Store backend trait
///
/// Defines the interface for key-value store implementations.
/// Both in-memory and Redis backends implement this trait.
///
/// # Consistency Notes
///
/// Every write (conditional or not) bumps the key's version. An absent or
/// expired key reads as version `0`, so `set_if_version(key, _, 0, _)` is
/// "create if absent". Conditional writes are linearizable per key, which is
/// what the aggregate read-modify-write loop relies on to never lose updates.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the store
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Unconditionally set a value with optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Get a value together with its current version
    async fn get_versioned(&self, key: &str) -> Result<Option<VersionedBytes>, CacheError>;

    /// Write `value` only if the key's current version equals `expected_version`
    ///
    /// Returns `false` without writing when another writer got there first.
    /// The TTL is reset on every successful write.
    async fn set_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_version: u64,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// Get the TTL remaining for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
