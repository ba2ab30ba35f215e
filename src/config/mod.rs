//! Configuration management module

pub mod settings;

pub use settings::*;

use crate::{
    strategy::{ExitCompletion, SignalPolicy},
    trading::{Backoff, RetryPolicy},
    PairsTradingError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the pairs trading bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Signal configuration for the open-trade ledger
    pub strategy: StrategyConfig,
    /// Signal configuration for the close-only ledger
    pub close_only: CloseOnlyConfig,
    /// Order execution configuration
    pub execution: ExecutionConfig,
    /// Exchange configuration
    pub exchange: ExchangeConfig,
    /// Input and state file locations
    pub files: FilesConfig,
    /// Tradable-pairs filter configuration
    pub filter: FilterConfig,
    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

/// Strategy-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Rolling z-score window in samples
    pub window: usize,
    /// Absolute z-score above which a pair is entered
    pub entry_z: f64,
    /// Absolute z-score past which an open pair is exited
    pub exit_z: f64,
    /// Notional per pair, in margin coin, used to size the base leg
    pub order_size: f64,
}

/// Close-only ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseOnlyConfig {
    /// Rolling z-score window in samples
    pub window: usize,
    /// Absolute z-score past which a close-only pair is exited
    pub exit_z: f64,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Additional attempts per exit leg after the first one
    pub order_retries: u32,
    /// Delay policy between attempts
    pub backoff: Backoff,
    /// When an exit counts as complete
    pub exit_completion: ExitCompletion,
    /// Pause between pairs when closing a whole ledger, in milliseconds
    pub close_all_interval_ms: u64,
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// REST API base URL
    pub rest_api_url: String,
    /// Product type for market data requests
    pub product_type: String,
    /// Candle granularity, e.g. `1H`
    pub granularity: String,
    /// Margin coin for orders
    pub margin_coin: String,
    /// Suffix appended to a market symbol to form the contract symbol
    pub symbol_suffix: String,
    /// Time in force sent with market orders
    pub time_in_force: String,
    /// Decimal places kept when formatting order sizes
    pub size_decimals: u32,
    /// HTTP timeout in seconds
    pub connection_timeout_secs: u64,
    /// Minimum interval between market data requests, in milliseconds
    pub market_data_interval_ms: u64,
    /// Candles requested per history page, at most 200
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,
    /// Candles collected per market, paging back in time as needed
    #[serde(default = "default_candles_per_market")]
    pub candles_per_market: usize,
    /// Markets to fetch candles for
    pub markets: Vec<String>,
    /// Authentication settings
    pub auth: AuthConfig,
}

/// Authentication configuration; values may reference `${ENV_VAR}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// API key
    pub api_key: String,
    /// Secret key
    pub secret_key: String,
    /// API passphrase
    pub passphrase: String,
}

/// Expanded exchange credentials
#[derive(Clone)]
pub struct Credentials {
    /// API key
    pub api_key: String,
    /// Secret key
    pub secret_key: String,
    /// API passphrase
    pub passphrase: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .finish()
    }
}

/// Input and state file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Price table CSV
    pub price_data: PathBuf,
    /// Cointegrated pairs CSV (`Base,Quote,HedgeRatio`)
    pub cointegrated_pairs: PathBuf,
    /// Spread table CSV written by the `spreads` command
    pub spreads: PathBuf,
    /// Spread table CSV consulted by the close-only ledger
    pub close_only_spreads: PathBuf,
    /// Open-trade ledger
    pub open_positions: PathBuf,
    /// Close-only ledger
    pub close_only_positions: PathBuf,
}

/// Tradable-pairs filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum Sharpe ratio for a pair to be kept
    pub min_sharpe: f64,
    /// Optimal parameters JSON
    pub optimal_parameters: PathBuf,
    /// Back-test results JSON
    pub test_results: PathBuf,
    /// Filtered output JSON
    pub output: PathBuf,
}

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable the Prometheus exporter
    pub enable_metrics: bool,
    /// Listen address for the Prometheus exporter
    pub metrics_listen_addr: String,
}

impl BotConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| PairsTradingError::Config(format!("Failed to read config file: {}", e)))?;

        let config: BotConfig = toml::from_str(&content)
            .map_err(|e| PairsTradingError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_window(self.strategy.window, "strategy.window")?;
        ConfigValidator::validate_positive(self.strategy.entry_z, "strategy.entry_z")?;
        ConfigValidator::validate_positive(self.strategy.exit_z, "strategy.exit_z")?;
        ConfigValidator::validate_positive(self.strategy.order_size, "strategy.order_size")?;

        ConfigValidator::validate_window(self.close_only.window, "close_only.window")?;
        ConfigValidator::validate_positive(self.close_only.exit_z, "close_only.exit_z")?;

        self.execution.backoff.validate()?;

        ConfigValidator::validate_url(&self.exchange.rest_api_url, "exchange.rest_api_url")?;
        if self.exchange.margin_coin.is_empty() {
            return Err(PairsTradingError::Config("Margin coin cannot be empty".to_string()).into());
        }
        if self.exchange.candle_limit == 0 || self.exchange.candle_limit > ConfigDefaults::MAX_CANDLE_LIMIT {
            return Err(PairsTradingError::Config(format!(
                "exchange.candle_limit must be between 1 and {}",
                ConfigDefaults::MAX_CANDLE_LIMIT
            ))
            .into());
        }
        let window = self.strategy.window.max(self.close_only.window);
        if self.exchange.candles_per_market <= window {
            return Err(PairsTradingError::Config(format!(
                "exchange.candles_per_market must exceed the largest window ({})",
                window
            ))
            .into());
        }
        for market in &self.exchange.markets {
            ConfigValidator::validate_symbol(market)?;
        }

        if !self.filter.min_sharpe.is_finite() {
            return Err(PairsTradingError::Config("filter.min_sharpe must be finite".to_string()).into());
        }

        if self.monitoring.enable_metrics {
            self.metrics_addr()?;
        }

        Ok(())
    }

    /// Expand credential references against the environment
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            api_key: EnvExpander::expand(&self.exchange.auth.api_key)?,
            secret_key: EnvExpander::expand(&self.exchange.auth.secret_key)?,
            passphrase: EnvExpander::expand(&self.exchange.auth.passphrase)?,
        })
    }

    /// Signal policy for the open-trade ledger
    pub fn open_trade_policy(&self) -> SignalPolicy {
        SignalPolicy::open_trades(self.strategy.window, self.strategy.entry_z, self.strategy.exit_z)
    }

    /// Signal policy for the close-only ledger
    pub fn close_only_policy(&self) -> SignalPolicy {
        SignalPolicy::close_only(self.close_only.window, self.close_only.exit_z)
    }

    /// Retry policy for exit legs
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.execution.order_retries, self.execution.backoff.clone())
    }

    /// Minimum interval between market data requests
    pub fn market_data_interval(&self) -> Duration {
        Duration::from_millis(self.exchange.market_data_interval_ms)
    }

    /// Pause between pairs when closing a whole ledger
    pub fn close_all_interval(&self) -> Duration {
        Duration::from_millis(self.execution.close_all_interval_ms)
    }

    /// Parsed Prometheus listen address
    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        self.monitoring
            .metrics_listen_addr
            .parse()
            .map_err(|e| {
                PairsTradingError::Config(format!(
                    "Invalid metrics listen address '{}': {}",
                    self.monitoring.metrics_listen_addr, e
                ))
                .into()
            })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig {
                window: ConfigDefaults::WINDOW,
                entry_z: ConfigDefaults::ENTRY_Z,
                exit_z: ConfigDefaults::EXIT_Z,
                order_size: ConfigDefaults::ORDER_SIZE,
            },
            close_only: CloseOnlyConfig {
                window: ConfigDefaults::WINDOW,
                exit_z: ConfigDefaults::CLOSE_ONLY_EXIT_Z,
            },
            execution: ExecutionConfig {
                order_retries: ConfigDefaults::ORDER_RETRIES,
                backoff: Backoff::Fixed {
                    delay_ms: ConfigDefaults::RETRY_DELAY_MS,
                },
                exit_completion: ExitCompletion::AllLegs,
                close_all_interval_ms: ConfigDefaults::CLOSE_ALL_INTERVAL_MS,
            },
            exchange: ExchangeConfig {
                rest_api_url: "https://api.bitget.com".to_string(),
                product_type: "USDT-FUTURES".to_string(),
                granularity: "1H".to_string(),
                margin_coin: "USDT".to_string(),
                symbol_suffix: "_UMCBL".to_string(),
                time_in_force: "normal".to_string(),
                size_decimals: ConfigDefaults::SIZE_DECIMALS,
                connection_timeout_secs: ConfigDefaults::CONNECTION_TIMEOUT_SECS,
                market_data_interval_ms: ConfigDefaults::MARKET_DATA_INTERVAL_MS,
                candle_limit: ConfigDefaults::CANDLE_LIMIT,
                candles_per_market: ConfigDefaults::CANDLES_PER_MARKET,
                markets: default_markets(),
                auth: AuthConfig {
                    api_key: "${BITGET_API_KEY}".to_string(),
                    secret_key: "${BITGET_SECRET_KEY}".to_string(),
                    passphrase: "${BITGET_PASSPHRASE}".to_string(),
                },
            },
            files: FilesConfig {
                price_data: PathBuf::from("data.csv"),
                cointegrated_pairs: PathBuf::from("cointegrated_pairs.csv"),
                spreads: PathBuf::from("spreads.csv"),
                close_only_spreads: PathBuf::from("close_only_spreads.csv"),
                open_positions: PathBuf::from("open_positions.json"),
                close_only_positions: PathBuf::from("close_only.json"),
            },
            filter: FilterConfig {
                min_sharpe: ConfigDefaults::MIN_SHARPE,
                optimal_parameters: PathBuf::from("optimal_parameters.json"),
                test_results: PathBuf::from("test_results.json"),
                output: PathBuf::from("tradable_pairs.json"),
            },
            monitoring: MonitoringConfig {
                enable_metrics: false,
                metrics_listen_addr: "127.0.0.1:9000".to_string(),
            },
        }
    }
}

fn default_candle_limit() -> u32 {
    ConfigDefaults::CANDLE_LIMIT
}

fn default_candles_per_market() -> usize {
    ConfigDefaults::CANDLES_PER_MARKET
}

fn default_markets() -> Vec<String> {
    [
        "BTCUSDT", "ETHUSDT", "XRPUSDT", "EOSUSDT", "BCHUSDT", "LTCUSDT", "ADAUSDT", "ETCUSDT",
        "LINKUSDT", "DOGEUSDT", "SOLUSDT", "MATICUSDT", "BNBUSDT", "UNIUSDT", "ICPUSDT",
        "AAVEUSDT", "XLMUSDT", "ATOMUSDT", "XTZUSDT", "SUSHIUSDT", "AXSUSDT", "THETAUSDT",
        "AVAXUSDT", "SHIBUSDT", "MANAUSDT", "GALAUSDT", "SANDUSDT", "DYDXUSDT", "CRVUSDT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
