//! Exchange connector implementations

pub mod bitget;
pub mod paper;
pub mod traits;

pub use bitget::BitgetConnector;
pub use paper::{PaperExecutor, PaperFill};
pub use traits::*;

use crate::{config::BotConfig, PairsTradingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where orders go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Orders are sent to the exchange
    Live,
    /// Orders are simulated locally
    Paper,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Live => write!(f, "live"),
            ExecutionMode::Paper => write!(f, "paper"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = PairsTradingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(ExecutionMode::Live),
            "paper" | "dry-run" => Ok(ExecutionMode::Paper),
            _ => Err(PairsTradingError::Config(format!("Unknown execution mode: {}", s))),
        }
    }
}

/// Connector factory for creating order executors
pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Create an order executor for the requested mode
    pub fn create_executor(
        mode: ExecutionMode,
        config: &BotConfig,
    ) -> Result<Box<dyn OrderExecutor>> {
        match mode {
            ExecutionMode::Live => {
                if cfg!(feature = "dry-run-only") {
                    return Err(PairsTradingError::Config(
                        "Live order placement is disabled in dry-run-only builds".to_string(),
                    )
                    .into());
                }
                let credentials = config.credentials()?;
                let connector = BitgetConnector::new(&config.exchange, Some(credentials))?;
                Ok(Box::new(connector))
            }
            ExecutionMode::Paper => Ok(Box::new(PaperExecutor::new())),
        }
    }

    /// Create a market data source; public endpoints need no credentials
    pub fn create_market_data_source(config: &BotConfig) -> Result<BitgetConnector> {
        BitgetConnector::new(&config.exchange, None)
    }
}
