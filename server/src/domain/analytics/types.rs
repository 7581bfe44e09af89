//! Delivery analytics data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::error::AnalyticsError;
use super::score::{is_on_time, performance_score, time_variance};
use crate::core::constants::{MAX_ID_LENGTH, MAX_PERFORMANCE_SCORE};

/// Validate generic ID length in characters (delivery, order and driver ids)
///
/// Counts chars, as the `length` rules on [`DeliverySubmission`] do.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().count() <= MAX_ID_LENGTH
}

// =============================================================================
// Inbound
// =============================================================================

/// Raw delivery-completion payload as submitted
///
/// Every field is optional at the wire level so that missing required fields
/// can be reported together instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySubmission {
    /// Unique delivery identifier (required)
    #[validate(length(min = 1, max = 256))]
    pub delivery_id: Option<String>,
    /// Order identifier (required)
    #[validate(length(min = 1, max = 256))]
    pub order_id: Option<String>,
    /// Actual delivery duration in seconds (required, positive)
    #[validate(range(min = 1))]
    pub actual_delivery_time: Option<i64>,
    /// Driver identifier
    #[validate(length(min = 1, max = 256))]
    pub driver_id: Option<String>,
    /// Expected delivery duration in seconds (positive)
    #[validate(range(min = 1))]
    pub expected_delivery_time: Option<i64>,
}

/// Validated delivery event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEvent {
    pub delivery_id: String,
    pub order_id: String,
    pub actual_duration: u64,
    pub expected_duration: Option<u64>,
    pub driver_id: Option<String>,
}

/// Map a struct field name to its wire name
fn wire_name(field: &str) -> &str {
    match field {
        "delivery_id" => "deliveryId",
        "order_id" => "orderId",
        "actual_delivery_time" => "actualDeliveryTime",
        "driver_id" => "driverId",
        "expected_delivery_time" => "expectedDeliveryTime",
        other => other,
    }
}

/// Wire field order used in error reports
const FIELD_ORDER: [&str; 5] = [
    "deliveryId",
    "orderId",
    "actualDeliveryTime",
    "driverId",
    "expectedDeliveryTime",
];

fn invalid_fields_error(errors: &ValidationErrors) -> AnalyticsError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<String> = field_errors
        .keys()
        .map(|field| wire_name(field).to_string())
        .collect();
    fields.sort_by_key(|f| {
        FIELD_ORDER
            .iter()
            .position(|known| known == f)
            .unwrap_or(FIELD_ORDER.len())
    });

    let message = fields
        .iter()
        .map(|field| {
            let reason = match field.as_str() {
                "actualDeliveryTime" | "expectedDeliveryTime" => {
                    "must be a positive number of seconds".to_string()
                }
                _ => format!("must be 1-{MAX_ID_LENGTH} characters"),
            };
            format!("{field} {reason}")
        })
        .collect::<Vec<_>>()
        .join("; ");

    AnalyticsError::InvalidFields { fields, message }
}

impl DeliverySubmission {
    /// Check required fields and value constraints, producing a typed event
    pub fn into_event(self) -> Result<DeliveryEvent, AnalyticsError> {
        let checked = self.validate();
        let Self {
            delivery_id,
            order_id,
            actual_delivery_time,
            driver_id,
            expected_delivery_time,
        } = self;

        let (delivery_id, order_id, actual) = match (delivery_id, order_id, actual_delivery_time)
        {
            (Some(delivery_id), Some(order_id), Some(actual)) => (delivery_id, order_id, actual),
            (delivery_id, order_id, actual) => {
                let missing = [
                    ("deliveryId", delivery_id.is_none()),
                    ("orderId", order_id.is_none()),
                    ("actualDeliveryTime", actual.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name.to_string())
                .collect();
                return Err(AnalyticsError::MissingFields(missing));
            }
        };

        checked.map_err(|e| invalid_fields_error(&e))?;

        Ok(DeliveryEvent {
            delivery_id,
            order_id,
            // validated positive above
            actual_duration: actual.unsigned_abs(),
            expected_duration: expected_delivery_time.map(i64::unsigned_abs),
            driver_id,
        })
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Running statistics for one driver or for the whole platform
///
/// Averages are always derived from the running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub count: u64,
    pub total_duration: u64,
    pub average_duration: f64,
    /// Absent until the first observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    pub max_duration: u64,
    pub total_score: u64,
    /// `totalScore / count`, absent until the first scored observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    pub on_time_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl AggregateStats {
    /// Fold one observation into the running totals
    pub fn observe(&mut self, duration: u64, score: Option<u32>, at: DateTime<Utc>) {
        self.count += 1;
        self.total_duration = self.total_duration.saturating_add(duration);
        self.average_duration = self.total_duration as f64 / self.count as f64;
        self.min_duration = Some(self.min_duration.map_or(duration, |min| min.min(duration)));
        self.max_duration = self.max_duration.max(duration);

        if let Some(score) = score {
            self.total_score = self.total_score.saturating_add(u64::from(score));
            self.average_score = Some(self.total_score as f64 / self.count as f64);
            if score == MAX_PERFORMANCE_SCORE {
                self.on_time_count += 1;
            }
        }

        self.last_updated = Some(at);
    }
}

// =============================================================================
// Per-delivery record
// =============================================================================

/// Delivery lifecycle status recorded with the analytics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Completed,
}

/// Computed analytics for one delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    pub delivery_id: String,
    pub order_id: String,
    /// Seconds
    pub actual_delivery_time: u64,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_delivery_time: Option<u64>,
    /// `actual - expected` in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_variance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_on_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    /// Driver aggregate right after this delivery was merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_stats: Option<AggregateStats>,
}

impl AnalyticsRecord {
    /// Base record plus timing analytics when an expected duration was given
    pub fn from_event(event: &DeliveryEvent, timestamp: DateTime<Utc>) -> Self {
        let actual = event.actual_duration;
        let mut record = Self {
            delivery_id: event.delivery_id.clone(),
            order_id: event.order_id.clone(),
            actual_delivery_time: actual,
            timestamp,
            status: DeliveryStatus::Completed,
            expected_delivery_time: None,
            time_variance: None,
            performance_score: None,
            is_on_time: None,
            driver_id: event.driver_id.clone(),
            driver_stats: None,
        };

        if let Some(expected) = event.expected_duration {
            record.expected_delivery_time = Some(expected);
            record.time_variance = Some(time_variance(actual, expected));
            record.performance_score = Some(performance_score(actual, expected));
            record.is_on_time = Some(is_on_time(actual, expected));
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> DeliverySubmission {
        DeliverySubmission {
            delivery_id: Some("D1".to_string()),
            order_id: Some("O1".to_string()),
            actual_delivery_time: Some(1800),
            driver_id: Some("drv1".to_string()),
            expected_delivery_time: Some(1500),
        }
    }

    #[test]
    fn test_submission_deserializes_wire_names() {
        let json = r#"{
            "deliveryId": "D1",
            "orderId": "O1",
            "actualDeliveryTime": 1800,
            "expectedDeliveryTime": 1500,
            "driverId": "drv1"
        }"#;
        let parsed: DeliverySubmission = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.delivery_id.as_deref(), Some("D1"));
        assert_eq!(parsed.actual_delivery_time, Some(1800));
        assert_eq!(parsed.expected_delivery_time, Some(1500));
    }

    #[test]
    fn test_into_event_valid() {
        let event = submission().into_event().unwrap();
        assert_eq!(
            event,
            DeliveryEvent {
                delivery_id: "D1".to_string(),
                order_id: "O1".to_string(),
                actual_duration: 1800,
                expected_duration: Some(1500),
                driver_id: Some("drv1".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let err = DeliverySubmission {
            driver_id: Some("drv1".to_string()),
            ..Default::default()
        }
        .into_event()
        .unwrap_err();

        match err {
            AnalyticsError::MissingFields(fields) => {
                assert_eq!(fields, ["deliveryId", "orderId", "actualDeliveryTime"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_takes_priority_over_invalid() {
        let err = DeliverySubmission {
            order_id: Some(String::new()),
            actual_delivery_time: Some(-5),
            ..Default::default()
        }
        .into_event()
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingFields(ref f) if f == &["deliveryId"]));
    }

    #[test]
    fn test_non_positive_durations_rejected() {
        let err = DeliverySubmission {
            actual_delivery_time: Some(0),
            expected_delivery_time: Some(-1),
            ..submission()
        }
        .into_event()
        .unwrap_err();

        match err {
            AnalyticsError::InvalidFields { fields, message } => {
                assert_eq!(fields, ["actualDeliveryTime", "expectedDeliveryTime"]);
                assert!(message.contains("positive"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overlong_and_empty_ids_rejected() {
        let err = DeliverySubmission {
            delivery_id: Some("x".repeat(MAX_ID_LENGTH + 1)),
            driver_id: Some(String::new()),
            ..submission()
        }
        .into_event()
        .unwrap_err();

        match err {
            AnalyticsError::InvalidFields { fields, .. } => {
                assert_eq!(fields, ["deliveryId", "driverId"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multibyte_id_length_counts_chars() {
        let id = "é".repeat(200);
        assert!(id.len() > MAX_ID_LENGTH);
        assert!(is_valid_id(&id));
        assert!(!is_valid_id(&"é".repeat(MAX_ID_LENGTH + 1)));

        let event = DeliverySubmission {
            delivery_id: Some(id.clone()),
            ..submission()
        }
        .into_event()
        .unwrap();
        assert_eq!(event.delivery_id, id);
    }

    #[test]
    fn test_length_rules_match_max_id_length() {
        let at_limit = DeliverySubmission {
            order_id: Some("o".repeat(MAX_ID_LENGTH)),
            ..submission()
        };
        assert!(at_limit.into_event().is_ok());
    }

    #[test]
    fn test_observe_first_observation() {
        let mut stats = AggregateStats::default();
        let now = Utc::now();
        stats.observe(1800, Some(80), now);

        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_duration, 1800);
        assert_eq!(stats.average_duration, 1800.0);
        assert_eq!(stats.min_duration, Some(1800));
        assert_eq!(stats.max_duration, 1800);
        assert_eq!(stats.total_score, 80);
        assert_eq!(stats.average_score, Some(80.0));
        assert_eq!(stats.on_time_count, 0);
        assert_eq!(stats.last_updated, Some(now));
    }

    #[test]
    fn test_observe_keeps_min_avg_max_ordered() {
        let mut stats = AggregateStats::default();
        let now = Utc::now();
        for (duration, score) in [(600, Some(100)), (1200, None), (300, Some(100)), (2400, Some(0))] {
            stats.observe(duration, score, now);
            let min = stats.min_duration.unwrap() as f64;
            assert!(min <= stats.average_duration);
            assert!(stats.average_duration <= stats.max_duration as f64);
        }

        assert_eq!(stats.count, 4);
        assert_eq!(stats.total_duration, 4500);
        assert_eq!(stats.average_duration, 1125.0);
        assert_eq!(stats.min_duration, Some(300));
        assert_eq!(stats.max_duration, 2400);
        assert_eq!(stats.total_score, 200);
        // unscored observations still count toward the divisor
        assert_eq!(stats.average_score, Some(50.0));
        assert_eq!(stats.on_time_count, 2);
    }

    #[test]
    fn test_unscored_observation_leaves_score_absent() {
        let mut stats = AggregateStats::default();
        stats.observe(100, None, Utc::now());
        assert_eq!(stats.average_score, None);
        assert_eq!(stats.total_score, 0);
    }

    #[test]
    fn test_default_stats_serialize_without_min() {
        let json = serde_json::to_value(AggregateStats::default()).unwrap();
        assert!(json.get("minDuration").is_none());
        assert!(json.get("averageScore").is_none());
        assert_eq!(json["count"], 0);
        assert_eq!(json["onTimeCount"], 0);
    }

    #[test]
    fn test_record_from_event_with_expected() {
        let event = submission().into_event().unwrap();
        let record = AnalyticsRecord::from_event(&event, Utc::now());

        assert_eq!(record.time_variance, Some(300));
        assert_eq!(record.performance_score, Some(80));
        assert_eq!(record.is_on_time, Some(false));
        assert_eq!(record.driver_id.as_deref(), Some("drv1"));
        assert_eq!(record.status, DeliveryStatus::Completed);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["actualDeliveryTime"], 1800);
        assert_eq!(json["timeVariance"], 300);
    }

    #[test]
    fn test_record_without_expected_skips_scoring() {
        let event = DeliverySubmission {
            expected_delivery_time: None,
            driver_id: None,
            ..submission()
        }
        .into_event()
        .unwrap();
        let record = AnalyticsRecord::from_event(&event, Utc::now());

        let json = serde_json::to_value(&record).unwrap();
        for absent in [
            "expectedDeliveryTime",
            "timeVariance",
            "performanceScore",
            "isOnTime",
            "driverId",
            "driverStats",
        ] {
            assert!(json.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("drv1"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"x".repeat(MAX_ID_LENGTH + 1)));
    }
}
