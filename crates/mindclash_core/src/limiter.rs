//! # Rate Limiter
//!
//! Serializes outbound read requests against a provider that enforces a
//! global per-key budget. Tasks run strictly one at a time with a minimum
//! wall-clock gap between the *start* of one execution and the start of
//! the next. Provider throttling is retried with exponential backoff up to
//! a hard ceiling; exhaustion surfaces the last error to the caller.
//!
//! One limiter instance per connected identity. The limiter holds no
//! cross-process state.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Classifies errors the limiter may retry.
///
/// Implemented by the error types of every consumer that routes calls
/// through [`RateLimiter::run`]. Only rate-limit signals are retried;
/// everything else surfaces immediately.
pub trait Throttled {
    /// Whether the downstream reported "too many requests".
    fn is_rate_limited(&self) -> bool;
}

/// Rate limiter tuning.
#[derive(Clone, Copy, Debug)]
pub struct LimiterConfig {
    /// Minimum gap between consecutive task starts.
    pub min_gap: Duration,
    /// Base delay for throttle backoff (doubled per attempt).
    pub backoff_base: Duration,
    /// Upper bound on a single backoff delay.
    pub backoff_cap: Duration,
    /// Hard ceiling on retries after a throttled attempt.
    pub max_retries: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            min_gap: Duration::from_millis(1500),
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_secs(15),
            max_retries: 3,
        }
    }
}

/// Serializing rate limiter for ledger and content-store reads.
///
/// The internal mutex is a fair async mutex, so queued tasks execute in
/// FIFO submission order with no reordering within one instance. There is
/// no ordering guarantee across instances.
pub struct RateLimiter {
    config: LimiterConfig,
    /// Start time of the most recent task execution. Held across the whole
    /// task so that execution is strictly serialized.
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given tuning.
    #[must_use]
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            last_start: Mutex::new(None),
        }
    }

    /// Returns the configured minimum start-to-start gap.
    #[inline]
    #[must_use]
    pub const fn min_gap(&self) -> Duration {
        self.config.min_gap
    }

    /// Runs `task` through the limiter.
    ///
    /// Suspends until every previously enqueued task has finished and the
    /// minimum gap since the last task start has elapsed. Throttled
    /// failures are retried with backoff `base * 2^attempt` (capped), up
    /// to `max_retries` times.
    ///
    /// # Errors
    ///
    /// Returns the task's own error once retries are exhausted or the
    /// error is not a throttle signal.
    pub async fn run<T, E, F, Fut>(&self, mut task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Throttled,
    {
        let mut last_start = self.last_start.lock().await;
        let mut attempt: u32 = 0;

        loop {
            if let Some(started) = *last_start {
                let wait = self.config.min_gap.saturating_sub(started.elapsed());
                if !wait.is_zero() {
                    sleep(wait).await;
                }
            }
            *last_start = Some(Instant::now());

            match task().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() && attempt < self.config.max_retries => {
                    let delay = self
                        .config
                        .backoff_base
                        .saturating_mul(1u32 << attempt.min(16))
                        .min(self.config.backoff_cap);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "provider throttled request, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use parking_lot::Mutex as SyncMutex;

    #[derive(Debug)]
    struct TestError {
        throttled: bool,
    }

    impl Throttled for TestError {
        fn is_rate_limited(&self) -> bool {
            self.throttled
        }
    }

    fn limiter(gap_ms: u64) -> RateLimiter {
        RateLimiter::new(LimiterConfig {
            min_gap: Duration::from_millis(gap_ms),
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(1),
            max_retries: 3,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_gaps_at_least_min_gap() {
        let limiter = Arc::new(limiter(1500));
        let starts: Arc<SyncMutex<Vec<Instant>>> = Arc::new(SyncMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                limiter
                    .run(|| {
                        let starts = Arc::clone(&starts);
                        async move {
                            starts.lock().push(Instant::now());
                            Ok::<(), TestError>(())
                        }
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let starts = starts.lock();
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_call_retried_then_succeeds() {
        let limiter = limiter(10);
        let calls = AtomicU32::new(0);

        let result = limiter
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError { throttled: true })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_surfaces_error() {
        let limiter = limiter(10);
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = limiter
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { throttled: true }) }
            })
            .await;

        assert!(result.is_err());
        // Initial attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_throttle_error_not_retried() {
        let limiter = limiter(10);
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = limiter
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { throttled: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
