//! Rate-limit aware retry with exponential backoff and jitter

use crate::error::{CloudError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry configuration for provider operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound of the exponential part of the delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,

    /// Extra random delay, as a fraction of the exponential delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.3,
        }
    }
}

/// What happened during a retried call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryTrace {
    /// Attempts made, including the successful or final failing one
    pub attempts: u32,

    /// Every backoff sleep, in order
    pub delays: Vec<Duration>,
}

impl RetryConfig {
    /// Delay before retry `attempt` (1-based) without jitter:
    /// `min(initial * multiplier^(attempt-1), max)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay before retry `attempt` with `0..jitter` of extra random delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter);
        base + base.mul_f64(extra)
    }

    /// Run `call` until it succeeds, fails without being rate limited, or the
    /// attempt budget is spent. The final error is returned unchanged.
    pub async fn run<T, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        is_rate_limited: P,
        call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&CloudError) -> bool,
    {
        self.run_traced(cancel, is_rate_limited, call).await.0
    }

    /// Same as [`RetryConfig::run`], also reporting attempts and sleeps.
    pub async fn run_traced<T, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        is_rate_limited: P,
        mut call: F,
    ) -> (Result<T>, RetryTrace)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&CloudError) -> bool,
    {
        let mut trace = RetryTrace::default();
        let max_attempts = self.max_attempts.max(1);

        loop {
            if cancel.is_cancelled() {
                return (Err(cancelled()), trace);
            }

            trace.attempts += 1;
            let error = match call().await {
                Ok(value) => return (Ok(value), trace),
                Err(error) => error,
            };

            if !is_rate_limited(&error) {
                return (Err(error), trace);
            }
            if trace.attempts >= max_attempts {
                tracing::warn!(
                    attempts = trace.attempts,
                    "Rate limited and out of attempts: {}",
                    error
                );
                return (Err(error), trace);
            }

            let delay = self.delay_for_attempt(trace.attempts);
            tracing::info!(
                attempt = trace.attempts,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, backing off"
            );
            trace.delays.push(delay);
            if let Err(e) = sleep_or_cancel(cancel, delay).await {
                return (Err(e), trace);
            }
        }
    }
}

fn cancelled() -> CloudError {
    CloudError::Cancelled("operation cancelled by caller".to_string())
}

/// Sleep for `delay` unless `cancel` fires first.
pub async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(cancelled()),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited(e: &CloudError) -> bool {
        e.status() == Some(429)
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            backoff_multiplier: 2.0,
            jitter: 0.0,
        };

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(5), Duration::from_millis(10000)); // capped at max
        assert_eq!(config.delay_for_attempt(500), Duration::from_millis(10000));
    }

    #[test]
    fn test_jitter_stays_within_thirty_percent() {
        let config = RetryConfig::default();
        for attempt in 1..8 {
            let base = config.base_delay(attempt);
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= base);
            assert!(delay <= base.mul_f64(1.3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_k_rate_limits_then_result_of_attempt_k_plus_one() {
        let config = RetryConfig::default();
        let cancel = CancellationToken::new();

        for k in 0..5u32 {
            let calls = AtomicU32::new(0);
            let (result, trace) = config
                .run_traced(&cancel, rate_limited, || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n <= k {
                            Err::<(), _>(CloudError::api(Some(429), "Too Many Requests"))
                        } else {
                            Err(CloudError::api(Some(500), format!("attempt {n}")))
                        }
                    }
                })
                .await;

            assert_eq!(trace.attempts, k + 1);
            assert_eq!(trace.delays.len(), k as usize);
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
            let err = result.unwrap_err();
            assert_eq!(err.to_string(), format!("API error: attempt {}", k + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limited_error_is_not_retried() {
        let config = RetryConfig::default();
        let cancel = CancellationToken::new();
        let (result, trace) = config
            .run_traced(&cancel, rate_limited, || async {
                Err::<(), _>(CloudError::api(Some(400), "bad request"))
            })
            .await;

        assert!(matches!(result, Err(CloudError::ApiError { status: Some(400), .. })));
        assert_eq!(trace.attempts, 1);
        assert!(trace.delays.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_surfaces_rate_limit_error() {
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let (result, trace) = config
            .run_traced(&cancel, rate_limited, || async {
                Err::<(), _>(CloudError::api(Some(429), "throttled"))
            })
            .await;

        assert_eq!(trace.attempts, 3);
        assert_eq!(trace.delays.len(), 2);
        assert!(matches!(result, Err(CloudError::ApiError { status: Some(429), .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let config = RetryConfig::default();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let (result, _) = config
            .run_traced(&cancel, rate_limited, || {
                trigger.cancel();
                async { Err::<(), _>(CloudError::api(Some(429), "throttled")) }
            })
            .await;

        assert!(matches!(result, Err(CloudError::Cancelled(_))));
    }
}
