//! Historical candle download into a price table

use crate::{
    config::ConfigDefaults,
    connectors::{Candle, MarketDataSource},
    data::prices::PriceTable,
    trading::RateLimiter,
    PairsTradingError, Result,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pulls history candles for a list of markets, paced by a rate limiter
pub struct MarketDataFetcher<S> {
    source: S,
    limiter: RateLimiter,
    candles_per_market: usize,
}

impl<S: MarketDataSource> MarketDataFetcher<S> {
    /// Create a fetcher issuing at most one request per `interval`
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            limiter: RateLimiter::new(interval),
            candles_per_market: ConfigDefaults::CANDLES_PER_MARKET,
        }
    }

    /// Collect up to `count` of the most recent candles per market
    pub fn with_candles_per_market(mut self, count: usize) -> Self {
        self.candles_per_market = count.max(1);
        self
    }

    /// Fetch every market and align their closes on timestamp.
    /// A failing market is skipped; it is an error only if none succeed.
    pub async fn fetch_prices(&mut self, markets: &[String]) -> Result<PriceTable> {
        if markets.is_empty() {
            return Err(PairsTradingError::Config("No markets configured".to_string()).into());
        }

        let mut candles: IndexMap<String, Vec<Candle>> = IndexMap::new();
        for market in markets {
            match self.fetch_market(market).await {
                Ok(series) => {
                    info!("Fetched {} candles for {}", series.len(), market);
                    candles.insert(market.clone(), series);
                }
                Err(e) => warn!("Skipping {}: {}", market, e),
            }
        }

        if candles.is_empty() {
            return Err(PairsTradingError::MissingData("No market returned candle data".to_string()).into());
        }

        PriceTable::from_candles(&candles)
    }

    /// Page backwards from the newest candle until enough are collected or
    /// the history runs out. Candles are de-duplicated by open time.
    pub async fn fetch_market(&mut self, market: &str) -> Result<Vec<Candle>> {
        let mut collected: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
        let mut end_time: Option<DateTime<Utc>> = None;

        loop {
            self.limiter.acquire().await;
            let page = match self.source.history_candles(market, end_time).await {
                Ok(page) => page,
                Err(e) if collected.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Stopping history for {} at {} candles: {}", market, collected.len(), e);
                    break;
                }
            };

            let Some(oldest) = page.iter().map(|c| c.open_time).min() else {
                break;
            };
            let before = collected.len();
            for candle in page {
                collected.entry(candle.open_time).or_insert(candle);
            }
            debug!("{}: {} candles after page ending {:?}", market, collected.len(), end_time);

            if collected.len() >= self.candles_per_market || collected.len() == before {
                break;
            }

            let next_end = oldest - chrono::Duration::milliseconds(1);
            if end_time.is_some_and(|end| next_end >= end) {
                break;
            }
            end_time = Some(next_end);
        }

        let skip = collected.len().saturating_sub(self.candles_per_market);
        Ok(collected.into_values().skip(skip).collect())
    }
}
