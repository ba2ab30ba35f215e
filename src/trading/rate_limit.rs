//! Minimum-interval rate limiter for exchange requests

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Spaces successive calls at least `min_interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Minimum interval between permits
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next permit is available and take it
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            let next = last + self.min_interval;
            if next > Instant::now() {
                debug!("Rate limiter waiting {:?}", next - Instant::now());
                tokio::time::sleep_until(next).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
