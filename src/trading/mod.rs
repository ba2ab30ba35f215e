//! Trading execution modules

pub mod execution;
pub mod rate_limit;
pub mod retry;

pub use execution::{Leg, LegOutcome, OrderRouter};
pub use rate_limit::RateLimiter;
pub use retry::{Backoff, RetryPolicy};
