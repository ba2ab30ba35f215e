//! Per-leg order submission with retries

use crate::{
    connectors::{OrderExecutor, OrderRequest},
    trading::RetryPolicy,
    utils::metrics,
    PairsTradingError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

/// Which side of a pair an order belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// The base market of the pair
    Base,
    /// The quote market of the pair
    Quote,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Base => write!(f, "base"),
            Leg::Quote => write!(f, "quote"),
        }
    }
}

/// Result of submitting one leg
#[derive(Debug, Clone, PartialEq)]
pub struct LegOutcome {
    /// Leg that was submitted
    pub leg: Leg,
    /// Contract symbol
    pub symbol: String,
    /// Whether the exchange accepted the order
    pub succeeded: bool,
    /// Attempts made
    pub attempts: u32,
    /// Exchange order ID of the accepted attempt
    pub order_id: Option<String>,
    /// Last failure message, if any attempt failed
    pub last_error: Option<String>,
}

/// Errors raised before the request leaves, such as a size the exchange
/// precision cannot express. Resending the same order fails the same way.
fn is_invalid_request(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<PairsTradingError>(), Some(PairsTradingError::Trading(_)))
}

/// Sends order legs through an executor, retrying per policy
pub struct OrderRouter<E> {
    executor: E,
    retry: RetryPolicy,
}

impl<E: OrderExecutor> OrderRouter<E> {
    /// Create a router
    pub fn new(executor: E, retry: RetryPolicy) -> Self {
        Self { executor, retry }
    }

    /// Underlying executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Submit a leg exactly once
    pub async fn submit_once(&self, leg: Leg, order: &OrderRequest) -> LegOutcome {
        self.submit(leg, order, 1).await
    }

    /// Submit a leg, retrying failed attempts per the retry policy
    pub async fn submit_with_retry(&self, leg: Leg, order: &OrderRequest) -> LegOutcome {
        self.submit(leg, order, self.retry.max_attempts()).await
    }

    async fn submit(&self, leg: Leg, order: &OrderRequest, max_attempts: u32) -> LegOutcome {
        let mut outcome = LegOutcome {
            leg,
            symbol: order.symbol.clone(),
            succeeded: false,
            attempts: 0,
            order_id: None,
            last_error: None,
        };

        for attempt in 1..=max_attempts {
            outcome.attempts = attempt;
            crate::log_leg!(
                info,
                leg,
                order.symbol,
                order.side,
                order.size,
                attempt = attempt,
                "Submitting order leg"
            );

            match self.executor.place_order(order).await {
                Ok(response) if response.is_success() => {
                    outcome.succeeded = true;
                    outcome.order_id = response.order_id().map(str::to_string);
                    info!(
                        "{} leg {} {} executed, order id {}",
                        leg,
                        order.side,
                        order.symbol,
                        outcome.order_id.as_deref().unwrap_or("-")
                    );
                    metrics::record_order(leg, true);
                    return outcome;
                }
                Ok(response) => {
                    warn!(
                        "{} leg {} {} failed (attempt {}/{}): {} - {}",
                        leg, order.side, order.symbol, attempt, max_attempts, response.code, response.msg
                    );
                    outcome.last_error = Some(format!("{}: {}", response.code, response.msg));
                }
                Err(e) if is_invalid_request(&e) => {
                    error!("{} leg {} {} cannot be sent: {}", leg, order.side, order.symbol, e);
                    outcome.last_error = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    warn!(
                        "{} leg {} {} errored (attempt {}/{}): {}",
                        leg, order.side, order.symbol, attempt, max_attempts, e
                    );
                    outcome.last_error = Some(e.to_string());
                }
            }

            if attempt < max_attempts {
                info!("Retrying {} leg {}...", leg, order.symbol);
                self.retry.wait_before_retry(attempt).await;
            }
        }

        error!(
            "{} leg {} {} abandoned after {} attempts",
            leg, order.side, order.symbol, outcome.attempts
        );
        metrics::record_order(leg, false);
        outcome
    }
}
