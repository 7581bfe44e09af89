//! Delivery performance scoring
//!
//! A delivery scores 100 when it arrives within the expected time and decays
//! linearly to 0 at twice the expected time. Integer arithmetic keeps the
//! result exact and monotonically non-increasing in the actual duration.

use crate::core::constants::MAX_PERFORMANCE_SCORE;

/// Score a delivery in `[0, 100]`
///
/// `expected` must be positive; scoring is skipped entirely when no expected
/// duration was supplied.
pub fn performance_score(actual: u64, expected: u64) -> u32 {
    if actual <= expected {
        return MAX_PERFORMANCE_SCORE;
    }
    let deadline = expected.saturating_mul(2);
    if actual >= deadline {
        return 0;
    }
    // expected < actual < 2*expected here, so expected > 0
    let remaining = u128::from(deadline - actual);
    let score = remaining * u128::from(MAX_PERFORMANCE_SCORE) / u128::from(expected);
    score.min(u128::from(MAX_PERFORMANCE_SCORE)) as u32
}

/// On time (or early)
pub fn is_on_time(actual: u64, expected: u64) -> bool {
    actual <= expected
}

/// Signed difference `actual - expected` in seconds
pub fn time_variance(actual: u64, expected: u64) -> i64 {
    let diff = i128::from(actual) - i128::from(expected);
    diff.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
