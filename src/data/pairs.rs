//! Cointegrated pairs input and pair keys

use crate::{PairsTradingError, Result};
use anyhow::Context;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A base/quote pair with its externally computed hedge ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegratedPair {
    /// Base market symbol
    #[serde(rename = "Base")]
    pub base: String,
    /// Quote market symbol
    #[serde(rename = "Quote")]
    pub quote: String,
    /// Units of quote per unit of base in the spread
    #[serde(rename = "HedgeRatio")]
    pub hedge_ratio: f64,
}

impl CointegratedPair {
    /// Ledger and spread-column key for this pair
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.base, &self.quote)
    }
}

/// `{base}_{quote}` identifier of a pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    /// Base market symbol
    pub base: String,
    /// Quote market symbol
    pub quote: String,
}

impl PairKey {
    /// Create a key
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

impl FromStr for PairKey {
    type Err = PairsTradingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split('_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(PairKey::new(base, quote))
            }
            _ => Err(PairsTradingError::DataParsing(format!(
                "Invalid pair key '{}', expected BASE_QUOTE",
                s
            ))),
        }
    }
}

/// Load the cointegrated pairs CSV. A missing file yields `None`.
pub fn load_pairs<P: AsRef<Path>>(path: P) -> Result<Option<Vec<CointegratedPair>>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open file: {:?}", path))?;

    let pairs = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CointegratedPair>, _>>()
        .with_context(|| format!("Failed to parse cointegrated pairs: {:?}", path))?;

    Ok(Some(pairs))
}

/// Hedge ratio of the first pair matching `key`
pub fn find_hedge_ratio(pairs: &[CointegratedPair], key: &PairKey) -> Option<f64> {
    pairs
        .iter()
        .find(|p| p.base == key.base && p.quote == key.quote)
        .map(|p| p.hedge_ratio)
}
