//! Request pacing for rate-limited upstream services
//!
//! Nominatim's usage policy forbids bursts, so calls are spaced by a fixed
//! minimum interval and strictly one at a time.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Default spacing between geocoder calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1100);

/// Pacing policy for one upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Minimum time between the start of two calls
    pub min_interval: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Fixed-delay throttle shared by every caller of one service
#[derive(Debug)]
pub struct Throttle {
    policy: ThrottlePolicy,
    /// When the last permit was handed out
    last_permit: Mutex<Option<Instant>>,
}

impl Throttle {
    #[must_use]
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            last_permit: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Time left until the next call is allowed
    pub async fn time_until_next_request(&self) -> Duration {
        let last = *self.last_permit.lock().await;
        match last {
            Some(last) => (last + self.policy.min_interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Wait for a permit and record it.
    ///
    /// The lock is held while sleeping, so concurrent callers line up and
    /// each gets its own slot.
    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.policy.min_interval;
            if ready_at > Instant::now() {
                debug!(
                    "Throttling request for {:.2}s",
                    (ready_at - Instant::now()).as_secs_f64()
                );
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let throttle = Throttle::default();
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let throttle = Throttle::default();
        let start = Instant::now();

        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_until_next_request() {
        let throttle = Throttle::new(ThrottlePolicy {
            min_interval: Duration::from_secs(2),
        });
        assert_eq!(throttle.time_until_next_request().await, Duration::ZERO);

        throttle.acquire().await;
        let wait = throttle.time_until_next_request().await;
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(throttle.time_until_next_request().await, Duration::ZERO);
    }
}
