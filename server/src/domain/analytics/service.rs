//! Delivery analytics ingestion and queries

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::aggregator::StatsAggregator;
use super::error::AnalyticsError;
use super::types::{AggregateStats, AnalyticsRecord, DeliverySubmission};
use crate::core::config::AnalyticsConfig;
use crate::data::{CacheKey, CacheService};

/// Store connectivity snapshot
#[derive(Debug, Clone)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub connected: bool,
    pub error: Option<String>,
}

/// Orchestrates scoring, aggregate merging and record persistence
pub struct AnalyticsService {
    cache: Arc<CacheService>,
    aggregator: StatsAggregator,
    record_ttl: Duration,
}

impl AnalyticsService {
    pub fn new(cache: Arc<CacheService>, config: &AnalyticsConfig) -> Self {
        Self {
            aggregator: StatsAggregator::new(Arc::clone(&cache), config),
            cache,
            record_ttl: config.record_ttl,
        }
    }

    /// Process one delivery-completion event
    ///
    /// Only validation and the per-delivery record write can fail the call.
    /// Aggregate updates are best-effort: failures are logged and the driver
    /// aggregate is left out of the returned record.
    pub async fn ingest(
        &self,
        submission: DeliverySubmission,
    ) -> Result<AnalyticsRecord, AnalyticsError> {
        let event = submission.into_event()?;
        let mut record = AnalyticsRecord::from_event(&event, Utc::now());
        let score = record.performance_score;

        if let Some(driver_id) = &event.driver_id {
            let key = CacheKey::driver_stats(driver_id);
            match self
                .aggregator
                .merge_observation(&key, event.actual_duration, score)
                .await
            {
                Ok(stats) => record.driver_stats = Some(stats),
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        operation = "merge_driver_stats",
                        error = %e,
                        "Driver aggregate not updated"
                    );
                }
            }
        }

        let record_key = CacheKey::delivery_analytics(&event.delivery_id);
        if let Err(source) = self
            .cache
            .set(&record_key, &record, Some(self.record_ttl))
            .await
        {
            tracing::error!(
                key = %record_key,
                operation = "persist_record",
                error = %source,
                "Failed to persist delivery analytics"
            );
            return Err(AnalyticsError::RecordPersistence {
                key: record_key,
                source,
            });
        }

        let platform_key = CacheKey::platform_stats();
        if let Err(e) = self
            .aggregator
            .merge_observation(&platform_key, event.actual_duration, score)
            .await
        {
            tracing::warn!(
                key = %platform_key,
                operation = "merge_platform_stats",
                error = %e,
                "Platform aggregate not updated"
            );
        }

        tracing::info!(
            delivery_id = %record.delivery_id,
            order_id = %record.order_id,
            driver_id = record.driver_id.as_deref(),
            performance_score = record.performance_score,
            "Delivery analytics calculated"
        );

        Ok(record)
    }

    /// Platform-wide aggregate
    pub async fn platform_stats(&self) -> Result<Option<AggregateStats>, AnalyticsError> {
        self.aggregator.get(&CacheKey::platform_stats()).await
    }

    /// Aggregate for one driver
    pub async fn driver_stats(
        &self,
        driver_id: &str,
    ) -> Result<Option<AggregateStats>, AnalyticsError> {
        self.aggregator.get(&CacheKey::driver_stats(driver_id)).await
    }

    /// Stored analytics for one delivery
    pub async fn delivery_record(
        &self,
        delivery_id: &str,
    ) -> Result<Option<AnalyticsRecord>, AnalyticsError> {
        let key = CacheKey::delivery_analytics(delivery_id);
        self.cache
            .get::<AnalyticsRecord>(&key)
            .await
            .map_err(|e| AnalyticsError::StoreUnavailable {
                key,
                operation: "read",
                reason: e.to_string(),
            })
    }

    pub async fn health(&self) -> StoreHealth {
        let backend = self.cache.backend_name();
        match self.cache.health_check().await {
            Ok(()) => StoreHealth {
                backend,
                connected: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!(backend, error = %e, "Store health check failed");
                StoreHealth {
                    backend,
                    connected: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CacheConfig;
    use crate::data::cache::ManualClock;
    use crate::domain::analytics::test_support::UnavailableBackend;

    fn config() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    async fn memory_service() -> AnalyticsService {
        let cache = CacheService::new(&CacheConfig::default()).await.unwrap();
        AnalyticsService::new(Arc::new(cache), &config())
    }

    fn d1() -> DeliverySubmission {
        DeliverySubmission {
            delivery_id: Some("D1".to_string()),
            order_id: Some("O1".to_string()),
            actual_delivery_time: Some(1800),
            driver_id: Some("drv1".to_string()),
            expected_delivery_time: Some(1500),
        }
    }

    #[tokio::test]
    async fn test_ingest_scores_and_attaches_driver_stats() {
        let service = memory_service().await;

        let record = service.ingest(d1()).await.unwrap();
        assert_eq!(record.time_variance, Some(300));
        assert_eq!(record.performance_score, Some(80));
        assert_eq!(record.is_on_time, Some(false));

        let driver = record.driver_stats.clone().unwrap();
        assert_eq!(driver.count, 1);
        assert_eq!(driver.average_duration, 1800.0);
        assert_eq!(driver.average_score, Some(80.0));

        assert_eq!(service.driver_stats("drv1").await.unwrap(), Some(driver));
        let platform = service.platform_stats().await.unwrap().unwrap();
        assert_eq!(platform.count, 1);
        assert_eq!(service.delivery_record("D1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_ingest_without_driver_updates_platform_only() {
        let service = memory_service().await;
        let submission = DeliverySubmission {
            driver_id: None,
            ..d1()
        };

        let record = service.ingest(submission).await.unwrap();
        assert!(record.driver_stats.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("driverStats").is_none());

        let platform = service.platform_stats().await.unwrap().unwrap();
        assert_eq!(platform.count, 1);
        assert_eq!(platform.total_duration, 1800);
    }

    #[tokio::test]
    async fn test_unknown_aggregates_are_not_found() {
        let service = memory_service().await;
        assert_eq!(service.platform_stats().await.unwrap(), None);
        assert_eq!(service.driver_stats("ghost").await.unwrap(), None);
        assert_eq!(service.delivery_record("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resubmission_replaces_record_but_counts_twice() {
        let service = memory_service().await;

        service.ingest(d1()).await.unwrap();
        let second = DeliverySubmission {
            actual_delivery_time: Some(1200),
            ..d1()
        };
        service.ingest(second).await.unwrap();

        let stored = service.delivery_record("D1").await.unwrap().unwrap();
        assert_eq!(stored.actual_delivery_time, 1200);
        assert_eq!(stored.performance_score, Some(100));

        let driver = service.driver_stats("drv1").await.unwrap().unwrap();
        assert_eq!(driver.count, 2);
        assert_eq!(driver.total_duration, 3000);
        assert_eq!(driver.on_time_count, 1);
        let platform = service.platform_stats().await.unwrap().unwrap();
        assert_eq!(platform.count, 2);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let service = memory_service().await;
        let submission = DeliverySubmission {
            actual_delivery_time: None,
            ..d1()
        };

        let err = service.ingest(submission).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingFields(ref f) if f == &["actualDeliveryTime"]));
        assert_eq!(service.delivery_record("D1").await.unwrap(), None);
        assert_eq!(service.driver_stats("drv1").await.unwrap(), None);
        assert_eq!(service.platform_stats().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_aggregate_outage_still_records_delivery() {
        let cache = CacheService::with_backend(Arc::new(UnavailableBackend::default()));
        let service = AnalyticsService::new(Arc::new(cache), &config());

        let record = service.ingest(d1()).await.unwrap();
        assert!(record.driver_stats.is_none());
        assert_eq!(record.performance_score, Some(80));
        assert_eq!(service.delivery_record("D1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_record_write_failure_is_fatal() {
        let cache = CacheService::with_backend(Arc::new(UnavailableBackend::total_outage()));
        let service = AnalyticsService::new(Arc::new(cache), &config());

        let err = service.ingest(d1()).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::RecordPersistence { ref key, .. } if key == "v1:delivery_analytics:D1"
        ));

        let health = service.health().await;
        assert!(!health.connected);
        assert_eq!(health.backend, "unavailable");
    }

    #[tokio::test]
    async fn test_record_expires_before_aggregates() {
        let clock = Arc::new(ManualClock::new());
        let cache = CacheService::in_memory_with_clock(&CacheConfig::default(), clock.clone());
        let config = config();
        let service = AnalyticsService::new(Arc::new(cache), &config);

        service.ingest(d1()).await.unwrap();
        clock.advance(config.record_ttl + Duration::from_secs(1));

        assert_eq!(service.delivery_record("D1").await.unwrap(), None);
        assert!(service.driver_stats("drv1").await.unwrap().is_some());

        clock.advance(config.aggregate_ttl);
        assert_eq!(service.driver_stats("drv1").await.unwrap(), None);
        assert_eq!(service.platform_stats().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let service = memory_service().await;
        let health = service.health().await;
        assert!(health.connected);
        assert_eq!(health.backend, "memory");
        assert!(health.error.is_none());
    }

    #[tokio::test]
    async fn test_full_record_store_keeps_driver_aggregate() {
        let cache_config = CacheConfig {
            max_entries: 50,
            ..CacheConfig::default()
        };
        let cache = CacheService::new(&cache_config).await.unwrap();
        let service = AnalyticsService::new(Arc::new(cache), &config());

        for i in 0..2_000 {
            let driver = if i == 0 { "first" } else { "other" };
            let submission = DeliverySubmission {
                delivery_id: Some(format!("D{i}")),
                driver_id: Some(driver.to_string()),
                ..d1()
            };
            service.ingest(submission).await.unwrap();
        }

        assert_eq!(service.platform_stats().await.unwrap().unwrap().count, 2_000);
        assert_eq!(service.driver_stats("other").await.unwrap().unwrap().count, 1_999);
        let first = service.driver_stats("first").await.unwrap().unwrap();
        assert_eq!(first.count, 1);
    }
}
