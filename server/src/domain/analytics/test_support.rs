//! Store backends that misbehave on purpose

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::data::CacheError;
use crate::data::cache::{CacheBackend, VersionedBytes};

/// Every conditional write loses to a phantom writer
pub struct ConflictingBackend;

#[async_trait]
impl CacheBackend for ConflictingBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get_versioned(&self, _key: &str) -> Result<Option<VersionedBytes>, CacheError> {
        Ok(None)
    }

    async fn set_if_version(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _expected_version: u64,
        _ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(None)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "conflicting"
    }
}

/// Versioned reads never complete
pub struct StalledBackend;

#[async_trait]
impl CacheBackend for StalledBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get_versioned(&self, _key: &str) -> Result<Option<VersionedBytes>, CacheError> {
        std::future::pending().await
    }

    async fn set_if_version(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _expected_version: u64,
        _ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        std::future::pending().await
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(None)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "stalled"
    }
}

/// Aggregate operations fail; plain records work unless `down` is set
#[derive(Default)]
pub struct UnavailableBackend {
    records: Mutex<HashMap<String, Vec<u8>>>,
    down: bool,
    versioned_reads: AtomicUsize,
}

impl UnavailableBackend {
    /// Nothing works, including plain writes and health checks
    pub fn total_outage() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }

    pub fn versioned_reads(&self) -> usize {
        self.versioned_reads.load(Ordering::SeqCst)
    }

    fn refused() -> CacheError {
        CacheError::Connection("connection refused".to_string())
    }
}

#[async_trait]
impl CacheBackend for UnavailableBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if self.down {
            return Err(Self::refused());
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), CacheError> {
        if self.down {
            return Err(Self::refused());
        }
        self.records.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get_versioned(&self, _key: &str) -> Result<Option<VersionedBytes>, CacheError> {
        self.versioned_reads.fetch_add(1, Ordering::SeqCst);
        Err(Self::refused())
    }

    async fn set_if_version(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _expected_version: u64,
        _ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        Err(Self::refused())
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(None)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        if self.down {
            return Err(Self::refused());
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}
