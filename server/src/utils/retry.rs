//! Async retry utilities with jittered exponential backoff

use std::time::Duration;

use rand::Rng;

/// Upper bound on the backoff exponent so delays stay bounded
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Delay before the next attempt: `base * 2^(attempt-1)` plus up to `base` of jitter
fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    let exp = base_delay_ms.saturating_mul(1 << shift);
    let jitter = if base_delay_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=base_delay_ms)
    };
    Duration::from_millis(exp.saturating_add(jitter))
}

/// Retry an async operation while `is_retryable` accepts its error.
///
/// Returns `Ok((value, attempts))` on success, or `Err((error, attempts))` once
/// the error is not retryable or `max_attempts` is reached.
pub async fn retry_with_backoff_async<T, E, F, Fut, R>(
    max_attempts: u32,
    base_delay_ms: u64,
    is_retryable: R,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => {
                if attempts >= max_attempts || !is_retryable(&e) {
                    return Err((e, attempts));
                }
                let delay = backoff_delay(base_delay_ms, attempts);
                tracing::debug!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_success_on_first_try() {
        let result =
            retry_with_backoff_async(3, 1, |_: &&str| true, || async { Ok::<_, &str>(7) }).await;
        assert_eq!(result, Ok((7, 1)));
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let attempts = Cell::new(0);
        let result = retry_with_backoff_async(
            3,
            1,
            |_: &&str| true,
            || {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move { if n < 2 { Err("conflict") } else { Ok(n) } }
            },
        )
        .await;
        assert_eq!(result, Ok((2, 2)));
    }

    #[tokio::test]
    async fn test_failure_after_max_attempts() {
        let result =
            retry_with_backoff_async(3, 1, |_: &&str| true, || async { Err::<(), _>("conflict") })
                .await;
        assert_eq!(result, Err(("conflict", 3)));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let attempts = Cell::new(0);
        let result = retry_with_backoff_async(
            5,
            1,
            |e: &&str| *e == "conflict",
            || {
                attempts.set(attempts.get() + 1);
                async { Err::<(), _>("fatal") }
            },
        )
        .await;
        assert_eq!(result, Err(("fatal", 1)));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_backoff_delay_bounds() {
        assert_eq!(backoff_delay(0, 3), Duration::ZERO);

        let first = backoff_delay(10, 1);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_millis(20));

        let capped = backoff_delay(10, 50);
        assert!(capped <= Duration::from_millis(10 * 64 + 10));
    }
}
