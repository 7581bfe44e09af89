//! Lock-free aggregate merging over the versioned store
//!
//! Each merge reads the aggregate with its version, folds in one observation
//! and writes back only if nobody else wrote in between. Losers re-read and
//! try again, so concurrent merges on one key never drop an observation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::error::AnalyticsError;
use super::types::AggregateStats;
use crate::core::config::AnalyticsConfig;
use crate::core::constants::MERGE_RETRY_BASE_DELAY_MS;
use crate::data::{CacheError, CacheService};
use crate::utils::retry::retry_with_backoff_async;

/// Outcome of a single optimistic merge attempt
#[derive(Debug)]
enum MergeError {
    /// Another writer bumped the version since our read
    Conflict,
    Store(CacheError),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "version conflict"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

/// Merges observations into per-key running aggregates
pub struct StatsAggregator {
    cache: Arc<CacheService>,
    ttl: Duration,
    update_timeout: Duration,
    max_attempts: u32,
}

impl StatsAggregator {
    pub fn new(cache: Arc<CacheService>, config: &AnalyticsConfig) -> Self {
        Self {
            cache,
            ttl: config.aggregate_ttl,
            update_timeout: config.update_timeout,
            max_attempts: config.max_merge_attempts.max(1),
        }
    }

    /// Fold one observation into the aggregate at `key` and return the result
    ///
    /// The TTL is reset to the full aggregate window on every successful merge.
    pub async fn merge_observation(
        &self,
        key: &str,
        duration: u64,
        score: Option<u32>,
    ) -> Result<AggregateStats, AnalyticsError> {
        let merge = retry_with_backoff_async(
            self.max_attempts,
            MERGE_RETRY_BASE_DELAY_MS,
            |e: &MergeError| matches!(e, MergeError::Conflict),
            || self.try_merge(key, duration, score),
        );

        match tokio::time::timeout(self.update_timeout, merge).await {
            Ok(Ok((stats, attempts))) => {
                if attempts > 1 {
                    tracing::debug!(key = %key, attempts, "Aggregate merged after conflicts");
                }
                if tracing::enabled!(tracing::Level::DEBUG) {
                    self.log_remaining_ttl(key).await;
                }
                Ok(stats)
            }
            Ok(Err((MergeError::Conflict, attempts))) => Err(AnalyticsError::StoreUnavailable {
                key: key.to_string(),
                operation: "merge",
                reason: format!("version conflict persisted after {attempts} attempts"),
            }),
            Ok(Err((MergeError::Store(e), _))) => Err(AnalyticsError::StoreUnavailable {
                key: key.to_string(),
                operation: "merge",
                reason: e.to_string(),
            }),
            Err(_) => Err(AnalyticsError::UpstreamTimeout {
                key: key.to_string(),
                timeout_ms: self.update_timeout.as_millis() as u64,
            }),
        }
    }

    async fn try_merge(
        &self,
        key: &str,
        duration: u64,
        score: Option<u32>,
    ) -> Result<AggregateStats, MergeError> {
        let current = self
            .cache
            .get_versioned::<AggregateStats>(key)
            .await
            .map_err(MergeError::Store)?;

        let (mut stats, version) = match current {
            Some(read) => (read.value, read.version),
            None => (AggregateStats::default(), 0),
        };
        stats.observe(duration, score, Utc::now());

        let written = self
            .cache
            .set_if_version(key, &stats, version, Some(self.ttl))
            .await
            .map_err(MergeError::Store)?;

        if written {
            Ok(stats)
        } else {
            Err(MergeError::Conflict)
        }
    }

    async fn log_remaining_ttl(&self, key: &str) {
        match self.cache.ttl(key).await {
            Ok(remaining) => tracing::debug!(
                key = %key,
                remaining_secs = remaining.map(|d| d.as_secs()),
                "Aggregate window extended"
            ),
            Err(e) => tracing::debug!(
                key = %key,
                operation = "ttl",
                error = %e,
                "Failed to read aggregate TTL"
            ),
        }
    }

    /// Current aggregate, or `None` if never written or expired
    pub async fn get(&self, key: &str) -> Result<Option<AggregateStats>, AnalyticsError> {
        self.cache
            .get::<AggregateStats>(key)
            .await
            .map_err(|e| AnalyticsError::StoreUnavailable {
                key: key.to_string(),
                operation: "read",
                reason: e.to_string(),
            })
    }
}
