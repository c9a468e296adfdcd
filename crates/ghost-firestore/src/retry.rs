//! Retry policy for transient Firestore failures.
//!
//! Two loops share this policy:
//! - `with_retry` wraps a single REST call and retries network errors,
//!   429 and 5xx with capped exponential backoff plus jitter
//! - the optimistic read-modify-write loops in the repositories retry
//!   precondition failures using `RetryConfig::contention`

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info_span, warn, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("FIRESTORE_MAX_RETRIES").unwrap_or(defaults.max_retries),
            base_delay_ms: env_parse("FIRESTORE_RETRY_BASE_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: env_parse("FIRESTORE_RETRY_MAX_MS").unwrap_or(defaults.max_delay_ms),
        }
    }

    /// Policy for optimistic-lock contention: more attempts, shorter waits.
    pub fn contention() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// A server-provided delay wins. Otherwise the exponential delay is capped,
    /// then jittered into `[base, capped]`.
    pub fn delay_for(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        if let Some(after) = retry_after_ms {
            return Duration::from_millis(after);
        }

        let capped = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_ms);

        let jittered = (capped as f64 * jitter_factor()) as u64;
        Duration::from_millis(jittered.clamp(self.base_delay_ms, capped.max(self.base_delay_ms)))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Pseudo-random factor in [0, 1) taken from the clock's sub-second nanos.
fn jitter_factor() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Execute an async operation, retrying transient failures.
///
/// Does NOT retry 4xx other than 429, auth errors, not-found, already-exists
/// or precondition failures. Those are decisions for the caller.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    op: F,
) -> FirestoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("firestore_retry", operation = %operation, attempt = attempt + 1);
        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for(attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Firestore operation failed, retrying"
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Error returned when an optimistic loop exhausts its attempts.
pub(crate) fn contention_exhausted(resource: &str, attempts: u32) -> FirestoreError {
    FirestoreError::Contention(resource.to_string(), attempts)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 5000);
    }

    #[test]
    fn test_delay_honors_retry_after() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(0, Some(2000)), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_bounds() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 400,
        };
        for attempt in 0..10 {
            let delay = config.delay_for(attempt, None);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_retries_server_errors() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result = with_retry(&config, "test_op", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(FirestoreError::from_http_status(503, "unavailable"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result: FirestoreResult<()> = with_retry(&config, "test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FirestoreError::from_http_status(500, "boom"))
        })
        .await;

        assert!(matches!(result, Err(FirestoreError::ServerError(500, _))));
        assert_eq!(calls.load(Ordering::SeqCst), config.max_retries + 1);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result: FirestoreResult<()> = with_retry(&config, "test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FirestoreError::from_http_status(412, "stale"))
        })
        .await;

        tokio_test::assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
