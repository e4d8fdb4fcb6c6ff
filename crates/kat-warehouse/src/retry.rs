//! Retry with capped exponential backoff for transient provider errors.
//!
//! Only errors classified [`ErrorKind::Transient`](crate::ErrorKind) are
//! retried. Fatal errors and the final transient failure are returned as-is.

use std::future::Future;
use std::time::Duration;

use kat_config::WarehouseConfig;

use crate::error::ProviderError;

/// Configuration for retry behavior on transient provider errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl From<&WarehouseConfig> for RetryConfig {
    fn from(config: &WarehouseConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails fatally, or runs out of attempts.
///
/// A `Retry-After` hint from a 429 raises the wait, but never past
/// `max_delay`.
///
/// # Errors
///
/// Returns the last error from `op`.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                let mut delay = config.backoff(attempt);
                if let ProviderError::RateLimited { retry_after_secs } = &e {
                    delay = delay.max(Duration::from_secs(*retry_after_secs)).min(config.max_delay);
                }
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "transient warehouse error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn transient() -> ProviderError {
        ProviderError::Injected {
            kind: ErrorKind::Transient,
            message: "flaky".into(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
        assert_eq!(config.backoff(10), Duration::from_secs(2));
    }

    #[test]
    fn from_warehouse_config() {
        let config = RetryConfig::from(&WarehouseConfig::default());
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn transient_then_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast(), "test", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(transient())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast(), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast(), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Api {
                status: 403,
                message: "denied".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Api { status: 403, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let _: Result<(), _> = with_retry(&RetryConfig::none(), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
