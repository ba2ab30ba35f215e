//! Settings management utilities

use crate::{PairsTradingError, Result};
use std::env;

/// Environment variable expansion utility
pub struct EnvExpander;

impl EnvExpander {
    /// Expand environment variables in a string
    /// Supports the ${VAR_NAME} pattern
    pub fn expand(input: &str) -> Result<String> {
        let mut result = input.to_string();

        while let Some(start) = result.find("${") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 2..start + end];
                let var_value = env::var(var_name).map_err(|_| {
                    PairsTradingError::Config(format!(
                        "Environment variable '{}' not found",
                        var_name
                    ))
                })?;

                result.replace_range(start..start + end + 1, &var_value);
            } else {
                return Err(PairsTradingError::Config(
                    "Unclosed environment variable reference".to_string(),
                )
                .into());
            }
        }

        Ok(result)
    }
}

/// Configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a market symbol such as `BTCUSDT`
    pub fn validate_symbol(symbol: &str) -> Result<()> {
        if symbol.is_empty() {
            return Err(PairsTradingError::Config("Symbol cannot be empty".to_string()).into());
        }

        // Pair keys are `{base}_{quote}`, so an underscore inside a symbol
        // would make keys ambiguous.
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PairsTradingError::Config(format!(
                "Symbol '{}' must contain only alphanumeric characters",
                symbol
            ))
            .into());
        }

        Ok(())
    }

    /// Validate a positive value
    pub fn validate_positive(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PairsTradingError::Config(format!("{} must be positive", name)).into());
        }
        Ok(())
    }

    /// Validate a rolling window length; the sample deviation needs two points
    pub fn validate_window(window: usize, name: &str) -> Result<()> {
        if window < 2 {
            return Err(
                PairsTradingError::Config(format!("{} must be at least 2", name)).into(),
            );
        }
        Ok(())
    }

    /// Validate a URL format
    pub fn validate_url(value: &str, name: &str) -> Result<()> {
        if value.is_empty() {
            return Err(PairsTradingError::Config(format!("{} cannot be empty", name)).into());
        }

        let parsed = url::Url::parse(value)
            .map_err(|e| PairsTradingError::Config(format!("{} must be a valid URL: {}", name, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PairsTradingError::Config(format!(
                "{} must use http or https",
                name
            ))
            .into());
        }

        Ok(())
    }
}

/// Configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// Rolling z-score window in samples
    pub const WINDOW: usize = 200;

    /// Entry threshold for the open-trade ledger
    pub const ENTRY_Z: f64 = 3.0;

    /// Exit threshold for the open-trade ledger
    pub const EXIT_Z: f64 = 1.0;

    /// Exit threshold for the close-only ledger
    pub const CLOSE_ONLY_EXIT_Z: f64 = 2.0;

    /// Notional per pair in margin coin
    pub const ORDER_SIZE: f64 = 100.0;

    /// Additional attempts per exit leg after the first one
    pub const ORDER_RETRIES: u32 = 3;

    /// Delay between order retries in milliseconds
    pub const RETRY_DELAY_MS: u64 = 1000;

    /// Minimum interval between market data requests in milliseconds
    pub const MARKET_DATA_INTERVAL_MS: u64 = 500;

    /// Pause between pairs when closing a whole ledger, in milliseconds
    pub const CLOSE_ALL_INTERVAL_MS: u64 = 500;

    /// HTTP timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

    /// Minimum Sharpe ratio for a pair to be tradable
    pub const MIN_SHARPE: f64 = 1.0;

    /// Decimal places kept when formatting order sizes
    pub const SIZE_DECIMALS: u32 = 4;

    /// Candles requested per history page
    pub const CANDLE_LIMIT: u32 = 200;

    /// Largest page the history candles endpoint serves
    pub const MAX_CANDLE_LIMIT: u32 = 200;

    /// Candles collected per market by `fetch-data`
    pub const CANDLES_PER_MARKET: usize = 1000;
}
