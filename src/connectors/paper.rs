//! Paper executor used for dry runs
//!
//! Accepts every order (optionally rejecting a random fraction) and keeps
//! a history of fills so a dry run can be inspected afterwards.

use crate::{
    connectors::traits::{OrderExecutor, OrderRequest, OrderResponse},
    Result,
};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Code returned for simulated rejections
pub const PAPER_REJECT_CODE: &str = "paper-reject";

/// A simulated fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperFill {
    /// Simulated order ID
    pub order_id: String,
    /// Order that was filled
    pub order: OrderRequest,
    /// Fill timestamp in milliseconds
    pub timestamp: i64,
}

/// Order executor that never touches the exchange
pub struct PaperExecutor {
    rejection_probability: f64,
    rng: Mutex<StdRng>,
    fills: Mutex<Vec<PaperFill>>,
}

impl PaperExecutor {
    /// Create an executor that fills every order
    pub fn new() -> Self {
        Self {
            rejection_probability: 0.0,
            rng: Mutex::new(StdRng::from_entropy()),
            fills: Mutex::new(Vec::new()),
        }
    }

    /// Reject each order with the given probability (0.0 to 1.0)
    pub fn with_rejection_probability(mut self, probability: f64) -> Self {
        self.rejection_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Use a deterministic random source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Fills recorded so far
    pub async fn fills(&self) -> Vec<PaperFill> {
        self.fills.lock().await.clone()
    }

    async fn should_reject(&self) -> bool {
        if self.rejection_probability <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().await;
        rng.gen::<f64>() < self.rejection_probability
    }
}

impl Default for PaperExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        if self.should_reject().await {
            warn!("Paper order rejected: {} {} {}", order.side, order.size, order.symbol);
            return Ok(OrderResponse::rejected(
                PAPER_REJECT_CODE,
                "Order rejected in simulation",
            ));
        }

        let order_id = Uuid::new_v4().to_string();
        self.fills.lock().await.push(PaperFill {
            order_id: order_id.clone(),
            order: order.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        info!("Paper order filled: {} {} {} ({})", order.side, order.size, order.symbol, order_id);
        Ok(OrderResponse::accepted(order_id))
    }
}
