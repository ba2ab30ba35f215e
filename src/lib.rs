//! Pairs Trading Bot
//!
//! A statistical-arbitrage trading system for USDT-margined perpetual futures.
//! Builds spreads between cointegrated markets, derives rolling z-scores and
//! opens or unwinds hedged pairs of positions when thresholds are crossed.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connectors;
pub mod data;
pub mod ledger;
pub mod strategy;
pub mod trading;
pub mod utils;

// Re-export commonly used types
pub use config::BotConfig;
pub use connectors::{BitgetConnector, OrderExecutor, PaperExecutor};
pub use data::{CointegratedPair, PriceTable, SpreadTable};
pub use ledger::{JsonFileStore, MemoryStore, PositionLedger, PositionRecord};
pub use strategy::{PairsTradingEngine, SignalPolicy};

/// Result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the pairs trading system
#[derive(thiserror::Error, Debug)]
pub enum PairsTradingError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    DataParsing(String),

    /// A symbol, spread column or hedge ratio is absent from the inputs
    #[error("Missing data: {0}")]
    MissingData(String),

    /// The exchange answered with a non-success code
    #[error("Exchange error {code}: {msg}")]
    Exchange {
        /// Provider response code
        code: String,
        /// Provider message
        msg: String,
    },

    /// Trading error
    #[error("Trading error: {0}")]
    Trading(String),

    /// Position ledger error
    #[error("Ledger error: {0}")]
    Ledger(String),
}

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
