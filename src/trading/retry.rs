//! Retry and backoff policy for order legs

use crate::{PairsTradingError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Delay grows geometrically up to a ceiling
    Exponential {
        /// Delay before the first retry, in milliseconds
        initial_ms: u64,
        /// Growth factor applied per retry
        multiplier: f64,
        /// Upper bound on any single delay, in milliseconds
        max_ms: u64,
    },
}

impl Backoff {
    /// Delay before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            Backoff::Exponential {
                initial_ms,
                multiplier,
                max_ms,
            } => {
                let exponent = retry.saturating_sub(1) as i32;
                let raw = *initial_ms as f64 * multiplier.powi(exponent);
                let capped = if raw.is_finite() {
                    raw.min(*max_ms as f64)
                } else {
                    *max_ms as f64
                };
                Duration::from_millis(capped as u64)
            }
        }
    }

    /// Check the schedule parameters
    pub fn validate(&self) -> Result<()> {
        if let Backoff::Exponential {
            initial_ms,
            multiplier,
            max_ms,
        } = self
        {
            if !multiplier.is_finite() || *multiplier < 1.0 {
                return Err(PairsTradingError::Config(
                    "Backoff multiplier must be at least 1.0".to_string(),
                )
                .into());
            }
            if max_ms < initial_ms {
                return Err(PairsTradingError::Config(
                    "Backoff max_ms must not be below initial_ms".to_string(),
                )
                .into());
            }
        }
        Ok(())
    }
}

/// How many times an order leg is retried and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    retries: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy allowing `retries` additional attempts after the first
    pub fn new(retries: u32, backoff: Backoff) -> Self {
        Self { retries, backoff }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(0, Backoff::Fixed { delay_ms: 0 })
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Additional attempts after the first
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay schedule
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Sleep before the given retry (1-based)
    pub async fn wait_before_retry(&self, retry: u32) {
        let delay = self.backoff.delay_for(retry);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
