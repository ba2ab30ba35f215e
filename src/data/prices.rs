//! Close-price table

use crate::{connectors::Candle, data::table::TimeTable, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Close prices per market symbol, one row per candle timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    table: TimeTable,
}

impl PriceTable {
    /// Wrap an existing table
    pub fn from_table(table: TimeTable) -> Self {
        Self { table }
    }

    /// Align candle closes from several markets on open time.
    /// A market without a candle at some timestamp gets a missing value there.
    pub fn from_candles(candles: &IndexMap<String, Vec<Candle>>) -> Result<Self> {
        let times: BTreeSet<DateTime<Utc>> = candles
            .values()
            .flat_map(|series| series.iter().map(|c| c.open_time))
            .collect();
        let times: Vec<DateTime<Utc>> = times.into_iter().collect();

        let mut table = TimeTable::new(times.clone());
        for (symbol, series) in candles {
            let closes: HashMap<DateTime<Utc>, f64> = series.iter().map(|c| (c.open_time, c.close)).collect();
            let column = times.iter().map(|t| closes.get(t).copied()).collect();
            table.insert_column(symbol.clone(), column)?;
        }

        Ok(Self { table })
    }

    /// Read a price table CSV
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        TimeTable::read_csv(path).map(Self::from_table)
    }

    /// Write the price table CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.table.write_csv(path)
    }

    /// Underlying table
    pub fn table(&self) -> &TimeTable {
        &self.table
    }

    /// Price series of a symbol
    pub fn series(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.table.column(symbol)
    }

    /// Price of a symbol in the last row
    pub fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.table.last_value(symbol)
    }

    /// Symbols present in the table
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
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
