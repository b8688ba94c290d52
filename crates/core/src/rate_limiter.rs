//! Fixed-interval pacer for outbound provider calls.
//!
//! Every call to the metadata provider is funnelled through a single
//! [`RateLimiter`] so the process never exceeds the provider's request
//! ceiling, no matter how many imports run at once. Unlike a token bucket
//! there is no burst allowance: consecutive dispatches are always at least
//! `interval` apart, even after a long idle period.

use std::future::Future;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Default spacing between dispatches (4 calls per second).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

/// FIFO single-interval rate limiter.
///
/// Waiters queue on a fair mutex, so dispatch order follows submission
/// order. The lock is held only while waiting for the slot, never while the
/// task itself runs: a slow or failing task does not hold up the queue.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl RateLimiter {
    /// Create a limiter that spaces dispatches at least `interval` apart.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Create a limiter from a millisecond interval.
    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// The configured minimum interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `task` once its dispatch slot comes up.
    ///
    /// The task's output (including any error it returns) goes back to this
    /// caller only.
    pub async fn schedule<T, F, Fut>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait_for_slot().await;
        task().await
    }

    async fn wait_for_slot(&self) {
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                debug!("Provider rate limit: waiting {:?}", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}
