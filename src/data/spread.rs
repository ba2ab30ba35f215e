//! Spread calculation between cointegrated markets

use crate::{
    data::{pairs::CointegratedPair, prices::PriceTable, table::TimeTable},
    PairsTradingError, Result,
};
use std::path::Path;
use tracing::debug;

/// Spread series per pair, keyed by `{base}_{quote}`, sharing the price table's time index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadTable {
    table: TimeTable,
}

impl SpreadTable {
    /// Wrap an existing table
    pub fn from_table(table: TimeTable) -> Self {
        Self { table }
    }

    /// Read a spread table CSV
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        TimeTable::read_csv(path).map(Self::from_table)
    }

    /// Write the spread table CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.table.write_csv(path)
    }

    /// Underlying table
    pub fn table(&self) -> &TimeTable {
        &self.table
    }

    /// Spread series of a pair
    pub fn series(&self, key: &str) -> Option<&[Option<f64>]> {
        self.table.column(key)
    }

    /// Spread of a pair in the last row
    pub fn latest(&self, key: &str) -> Option<f64> {
        self.table.last_value(key)
    }

    /// Pair keys present in the table
    pub fn pair_keys(&self) -> impl Iterator<Item = &str> {
        self.table.column_names()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// `price[base] - hedge_ratio * price[quote]` for every pair, row by row.
/// Fails when a pair references a symbol the price table lacks.
pub fn calculate_spreads(prices: &PriceTable, pairs: &[CointegratedPair]) -> Result<SpreadTable> {
    let mut table = TimeTable::new(prices.table().times().to_vec());

    for pair in pairs {
        let base = prices
            .series(&pair.base)
            .ok_or_else(|| PairsTradingError::MissingData(format!("No price column for {}", pair.base)))?;
        let quote = prices
            .series(&pair.quote)
            .ok_or_else(|| PairsTradingError::MissingData(format!("No price column for {}", pair.quote)))?;

        let spread = base
            .iter()
            .zip(quote)
            .map(|(b, q)| match (b, q) {
                (Some(b), Some(q)) => Some(b - pair.hedge_ratio * q),
                _ => None,
            })
            .collect();

        debug!("Computed spread for {} (hedge ratio {})", pair.key(), pair.hedge_ratio);
        table.insert_column(pair.key().to_string(), spread)?;
    }

    Ok(SpreadTable { table })
}
