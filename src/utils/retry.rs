//! Retry utilities with exponential backoff.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::debug;

/// Attempts made for one operation before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fallback base delay when the provider gives no hint.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on any single wait, whatever the provider asks for.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_retries: u32,
    /// Delay before the first retry when no hint is available.
    pub initial_delay: Duration,
    /// Backoff multiplier (delay *= multiplier after each retry).
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_RETRY_BASE_DELAY,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// The base is the provider hint when present, otherwise `initial_delay`,
    /// scaled by `multiplier^(attempt - 1)`. Waits never shrink: a smaller
    /// hint on a later attempt still yields `previous * multiplier`. Every
    /// wait is capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(
        &self,
        attempt: u32,
        hint: Option<Duration>,
        previous: Option<Duration>,
    ) -> Duration {
        let base = hint.unwrap_or(self.initial_delay);
        let exponent = attempt.saturating_sub(1) as i32;
        let candidate = scale_capped(base, self.multiplier.powi(exponent));

        match previous {
            Some(prev) if candidate <= prev => {
                scale_capped(prev, self.multiplier.max(1.0))
                    .saturating_add(Duration::from_millis(1))
                    .min(MAX_RETRY_DELAY)
            }
            _ => candidate,
        }
    }
}

fn scale_capped(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
        .map_or(MAX_RETRY_DELAY, |scaled| scaled.min(MAX_RETRY_DELAY))
}

/// Retry result indicating what happened.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries.
    Failed { last_error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Convert to a Result, discarding retry information.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the operation should be retried.
    fn is_retryable(&self) -> bool;

    /// How long the remote side asked us to wait, if it said so.
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

/// A scheduled wait between two attempts.
#[derive(Debug)]
pub struct RetryWait<'a, E> {
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    /// How long we are about to sleep.
    pub delay: Duration,
    /// The error that triggered the wait.
    pub error: &'a E,
}

/// Execute an async operation with exponential backoff retry.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_notify(config, operation, |_| {}).await
}

/// Like [`with_retry`], reporting each wait to `on_wait` before sleeping.
pub async fn with_retry_notify<T, E, F, Fut, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_wait: N,
) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(RetryWait<'_, E>),
{
    let mut attempts = 0;
    let mut previous_delay = None;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(error) => {
                if attempts >= config.max_retries || !error.is_retryable() {
                    return RetryResult::Failed {
                        last_error: error,
                        attempts,
                    };
                }

                let delay = config.delay_for(attempts, error.retry_hint(), previous_delay);
                debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?error,
                    "retrying after backoff"
                );

                on_wait(RetryWait {
                    attempt: attempts,
                    delay,
                    error: &error,
                });

                sleep(delay).await;
                previous_delay = Some(delay);
            }
        }
    }
}

static RETRY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in\s+([0-9]+(?:\.[0-9]+)?)\s*s").expect("valid regex"));
static RETRY_DELAY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""retryDelay"\s*:\s*"([0-9]+(?:\.[0-9]+)?)s""#).expect("valid regex")
});
static RETRY_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry[- ]after:?\s+([0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});

/// Best-effort extraction of a retry delay from free-form provider text.
///
/// Recognizes "retry in 41.2s", a JSON `"retryDelay": "41s"` field and
/// "Retry-After: 41". Returns `None` when nothing parses.
pub fn parse_retry_hint(text: &str) -> Option<Duration> {
    [&*RETRY_IN, &*RETRY_DELAY_FIELD, &*RETRY_AFTER]
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct RetryableError(String);

    impl Retryable for RetryableError {
        fn is_retryable(&self) -> bool {
            self.0.contains("transient")
        }

        fn retry_hint(&self) -> Option<Duration> {
            parse_retry_hint(&self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_first_attempt() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, RetryableError>("success")
        })
        .await;

        match result {
            RetryResult::Success(v) => assert_eq!(v, "success"),
            _ => panic!("expected success"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_retries() {
        let counter = AtomicU32::new(0);
        let mut waits = Vec::new();
        let result = with_retry_notify(
            &RetryConfig::new(3).with_initial_delay(Duration::from_millis(10)),
            || async {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(RetryableError("transient error".to_string()))
                } else {
                    Ok("success")
                }
            },
            |wait| waits.push(wait.delay),
        )
        .await;

        match result {
            RetryResult::Success(v) => assert_eq!(v, "success"),
            _ => panic!("expected success"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(waits, vec![Duration::from_millis(10), Duration::from_millis(20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_non_retryable_error() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RetryableError("permanent error".to_string()))
        })
        .await;

        match result {
            RetryResult::Failed { attempts, .. } => assert_eq!(attempts, 1),
            _ => panic!("expected failure"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let counter = AtomicU32::new(0);
        let result = with_retry(
            &RetryConfig::new(3).with_initial_delay(Duration::from_millis(10)),
            || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RetryableError("transient error".to_string()))
            },
        )
        .await;

        match result {
            RetryResult::Failed { attempts, .. } => assert_eq!(attempts, 3),
            _ => panic!("expected failure"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_uses_provider_hint() {
        let counter = AtomicU32::new(0);
        let mut waits = Vec::new();
        let _ = with_retry_notify(
            &RetryConfig::default(),
            || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RetryableError("transient: please retry in 2s".to_string()))
            },
            |wait| waits.push(wait.delay),
        )
        .await;

        assert_eq!(waits, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn test_oversized_hint_text_is_ignored() {
        assert_eq!(
            parse_retry_hint("Quota exceeded. Please retry in 99999999999999999999999s."),
            None
        );
        assert_eq!(parse_retry_hint("Retry-After: 99999999999999999999999"), None);
    }

    #[test]
    fn test_delay_capped_for_huge_hint() {
        let config = RetryConfig::default();
        let huge = Some(Duration::from_secs(u64::MAX / 2));

        let first = config.delay_for(1, huge, None);
        assert_eq!(first, MAX_RETRY_DELAY);

        let second = config.delay_for(2, huge, Some(first));
        assert_eq!(second, MAX_RETRY_DELAY);

        let after_max = config.delay_for(3, Some(Duration::from_secs(1)), Some(Duration::MAX));
        assert_eq!(after_max, MAX_RETRY_DELAY);
    }

    #[test]
    fn test_delay_never_shrinks() {
        let config = RetryConfig::default();
        let first = config.delay_for(1, Some(Duration::from_secs(30)), None);
        assert_eq!(first, Duration::from_secs(30));

        let second = config.delay_for(2, Some(Duration::from_secs(1)), Some(first));
        assert!(second > first);
    }

    #[test]
    fn test_delay_doubles_from_fallback() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1, None, None), Duration::from_secs(5));
        assert_eq!(
            config.delay_for(2, None, Some(Duration::from_secs(5))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_parse_retry_hint() {
        assert_eq!(
            parse_retry_hint("Quota exceeded. Please retry in 41.5s."),
            Some(Duration::from_secs_f64(41.5))
        );
        assert_eq!(
            parse_retry_hint(r#"{"@type": "RetryInfo", "retryDelay": "12s"}"#),
            Some(Duration::from_secs(12))
        );
        assert_eq!(
            parse_retry_hint("Retry-After: 3"),
            Some(Duration::from_secs(3))
        );
        assert_eq!(parse_retry_hint("429 Too Many Requests"), None);
        assert_eq!(parse_retry_hint(""), None);
    }
}
