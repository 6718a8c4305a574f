//! Retry logic with exponential backoff for transient failures.
//!
//! The caller decides which errors are worth another attempt through the
//! `is_retryable` predicate; everything else fails on the first attempt.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one.
    pub max_retries: u32,
    /// Base delay between retries (doubled on every attempt).
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Whether to add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that performs exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Result of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T, E> {
    /// The final result: the first success or the last error seen.
    pub result: Result<T, E>,
    /// Number of attempts made (1 = no retries needed).
    pub attempts: u32,
    /// Total wall-clock time spent, delays included.
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Execute an async operation, retrying errors accepted by `is_retryable`.
///
/// `operation` receives the zero-based attempt number. Non-retryable errors are
/// returned immediately without sleeping.
///
/// ```ignore
/// let outcome = execute_with_retry(&RetryConfig::default(), |e: &MyError| e.is_transient(), |attempt| async move {
///     call_remote(attempt).await
/// })
/// .await;
/// ```
pub async fn execute_with_retry<T, E, F, Fut, R>(
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
            Err(error) => {
                if attempt >= config.max_retries || !is_retryable(&error) {
                    return RetryResult {
                        result: Err(error),
                        attempts: attempt + 1,
                        total_duration: start.elapsed(),
                    };
                }
                let delay = backoff_delay(config, attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retry_backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay before retry number `attempt + 1`.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    let delay = exponential.min(config.max_delay.as_millis() as u64);

    if config.jitter {
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay + jitter)
    } else {
        Duration::from_millis(delay)
    }
}

/// Classify an error message as transient.
///
/// Used where the only thing we have from a provider is a status line or a
/// transport message. Unknown messages are treated as retryable.
pub fn is_retryable_message(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("temporarily")
        || error_lower.contains("unavailable")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("429")
        || error_lower.contains("504")
        || error_lower.contains("408")
    {
        return true;
    }

    if error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("400")
        || error_lower.contains("invalid")
        || error_lower.contains("not found")
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retry_succeeds_eventually() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(&fast().with_max_retries(3), |_: &String| true, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("not yet".to_string())
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert!(result.succeeded());
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap(), "success");
    }

    #[tokio::test]
    async fn retry_fails_after_max_attempts() {
        let result: RetryResult<(), String> =
            execute_with_retry(&fast().with_max_retries(2), |_: &String| true, |_| async {
                Err("always fails".to_string())
            })
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: RetryResult<(), String> =
            execute_with_retry(&fast().with_max_retries(5), |e: &String| e != "fatal", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            })
            .await;

        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let result: RetryResult<(), &str> =
            execute_with_retry(&RetryConfig::none(), |_: &&str| true, |_| async { Err("boom") })
                .await;
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_jitter(false);
        assert_eq!(backoff_delay(&cfg, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(&cfg, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(&cfg, 2), Duration::from_millis(350));
        assert_eq!(backoff_delay(&cfg, 40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_half_delay() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(true);
        for _ in 0..50 {
            let d = backoff_delay(&cfg, 0);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn retryable_message_detection() {
        assert!(is_retryable_message("timeout"));
        assert!(is_retryable_message("connection reset"));
        assert!(is_retryable_message("HTTP 503"));
        assert!(is_retryable_message("HTTP 429"));
        assert!(is_retryable_message("service temporarily unavailable"));

        assert!(!is_retryable_message("HTTP 400"));
        assert!(!is_retryable_message("HTTP 401"));
        assert!(!is_retryable_message("HTTP 404"));
        assert!(!is_retryable_message("invalid api key"));
    }

    #[test]
    fn config_serializes_delays_as_millis() {
        let json = serde_json::to_value(RetryConfig::default()).unwrap();
        assert_eq!(json["base_delay"], 250);
        assert_eq!(json["max_delay"], 5000);
    }
}
