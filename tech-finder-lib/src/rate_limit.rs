//! Minimum-interval throttle for outbound lookups.
//!
//! Calls are strictly sequential, so a single "last dispatch" instant is all
//! the state needed. There is no burst allowance.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum spacing between the start of consecutive lookups.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with an explicit minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: None,
        }
    }

    /// Create a limiter from a requests-per-minute budget.
    ///
    /// 150 requests per minute gives a 400ms interval.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(Duration::from_secs(60) / requests.max(1))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Instant of the most recent dispatch, if any.
    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    /// How long a dispatch at `now` would have to wait.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_dispatch {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Wait until the next dispatch is allowed, then record it.
    ///
    /// The timestamp is taken before the caller issues its request, so the
    /// spacing is measured between dispatch starts, not completions.
    pub async fn acquire(&mut self) -> Duration {
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limit wait");
            tokio::time::sleep(wait).await;
        }
        self.last_dispatch = Some(Instant::now());
        wait
    }
}
