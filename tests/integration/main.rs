//! Integration tests for the pairs trading bot

mod test_bitget_connector;
mod test_ledger_files;
mod test_pipeline;
mod test_trade_cycle;

use chrono::DateTime;
use pairs_trading_bot::{
    config::BotConfig,
    data::{CointegratedPair, PriceTable, SpreadTable, TimeTable},
    trading::Backoff,
};

/// Test utilities for integration tests
pub struct TestUtils;

impl TestUtils {
    /// Default config with a short window and instant retries
    pub fn create_test_config(window: usize) -> BotConfig {
        let mut config = BotConfig::default();
        config.strategy.window = window;
        config.close_only.window = window;
        config.execution.backoff = Backoff::Fixed { delay_ms: 0 };
        config.execution.close_all_interval_ms = 0;
        config
    }

    /// Hourly timestamps starting at the epoch
    pub fn hourly_times(rows: usize) -> Vec<chrono::DateTime<chrono::Utc>> {
        (0..rows as i64)
            .map(|i| DateTime::from_timestamp(i * 3600, 0).unwrap())
            .collect()
    }

    /// Alternating +1/-1 spread history of `window - 1` samples followed by `last`
    pub fn spread_series(window: usize, last: f64) -> Vec<Option<f64>> {
        let mut values: Vec<Option<f64>> = (0..window - 1)
            .map(|i| Some(if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        values.push(Some(last));
        values
    }

    /// Spread table with one column per `(key, series)`
    pub fn spread_table(columns: &[(&str, Vec<Option<f64>>)]) -> SpreadTable {
        let rows = columns.first().map(|(_, s)| s.len()).unwrap_or(0);
        let mut table = TimeTable::new(Self::hourly_times(rows));
        for (key, series) in columns {
            table.insert_column(*key, series.clone()).unwrap();
        }
        SpreadTable::from_table(table)
    }

    /// Single-row price table
    pub fn latest_prices(prices: &[(&str, f64)]) -> PriceTable {
        let mut table = TimeTable::new(Self::hourly_times(1));
        for (symbol, price) in prices {
            table.insert_column(*symbol, vec![Some(*price)]).unwrap();
        }
        PriceTable::from_table(table)
    }

    /// A cointegrated pair
    pub fn pair(base: &str, quote: &str, hedge_ratio: f64) -> CointegratedPair {
        CointegratedPair {
            base: base.to_string(),
            quote: quote.to_string(),
            hedge_ratio,
        }
    }
}
