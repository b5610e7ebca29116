//! Fixed-interval request throttle
//!
//! A courtesy delay toward the external service, applied before every
//! listing and comment request. Correctness never depends on it.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between successive requests
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Minimum time between two requests
    interval: Duration,

    /// When the last request was let through
    last_request: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle with the given minimum interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: None,
        }
    }

    /// A throttle that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns how long a request at `now` would have to wait
    ///
    /// # Returns
    ///
    /// * `None` - A request can be made immediately
    /// * `Some(Duration)` - Time remaining until the interval has elapsed
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let ready_at = last + self.interval;

        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }

    /// Waits until a request is allowed, then records it
    pub async fn acquire(&mut self) {
        if let Some(wait) = self.time_until_ready(Instant::now()) {
            tracing::debug!("Throttling for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
    }
}
