//! Position ledger: pair key to open position record, persisted between runs

pub mod store;

pub use store::{JsonFileStore, LedgerStore, MemoryStore};

use crate::{connectors::TradeSide, trading::Leg, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Direction of a pair position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionType {
    /// Short base, long quote
    #[serde(rename = "short/long")]
    ShortLong,
    /// Long base, short quote
    #[serde(rename = "long/short")]
    LongShort,
}

impl PositionType {
    /// Side that opens the given leg
    pub fn entry_side(&self, leg: Leg) -> TradeSide {
        match (self, leg) {
            (PositionType::ShortLong, Leg::Base) | (PositionType::LongShort, Leg::Quote) => TradeSide::OpenShort,
            (PositionType::ShortLong, Leg::Quote) | (PositionType::LongShort, Leg::Base) => TradeSide::OpenLong,
        }
    }

    /// Side that closes the given leg
    pub fn exit_side(&self, leg: Leg) -> TradeSide {
        match self.entry_side(leg) {
            TradeSide::OpenShort => TradeSide::CloseShort,
            _ => TradeSide::CloseLong,
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::ShortLong => write!(f, "short/long"),
            PositionType::LongShort => write!(f, "long/short"),
        }
    }
}

/// Which legs of a recorded position are still open on the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLegs {
    /// Base leg open
    pub base: bool,
    /// Quote leg open
    pub quote: bool,
}

impl Default for OpenLegs {
    fn default() -> Self {
        Self { base: true, quote: true }
    }
}

impl OpenLegs {
    /// Both legs open (a hedged position)
    pub fn all_open(&self) -> bool {
        self.base && self.quote
    }

    /// At least one leg open
    pub fn any_open(&self) -> bool {
        self.base || self.quote
    }

    /// Whether a leg is open
    pub fn is_open(&self, leg: Leg) -> bool {
        match leg {
            Leg::Base => self.base,
            Leg::Quote => self.quote,
        }
    }

    /// Mark a leg closed
    pub fn close(&mut self, leg: Leg) {
        match leg {
            Leg::Base => self.base = false,
            Leg::Quote => self.quote = false,
        }
    }
}

fn is_fully_open(legs: &OpenLegs) -> bool {
    legs.all_open()
}

/// A recorded pair position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Position direction
    pub position_type: PositionType,
    /// Spread at entry
    pub entry_spread: f64,
    /// Base leg size in base units
    pub base_position_size: f64,
    /// Quote leg size in quote units
    pub quote_position_size: f64,
    /// Open legs; omitted from JSON while both are open
    #[serde(default, skip_serializing_if = "is_fully_open")]
    pub open_legs: OpenLegs,
}

impl PositionRecord {
    /// A hedged record with both legs open
    pub fn new(position_type: PositionType, entry_spread: f64, base_size: f64, quote_size: f64) -> Self {
        Self {
            position_type,
            entry_spread,
            base_position_size: base_size,
            quote_position_size: quote_size,
            open_legs: OpenLegs::default(),
        }
    }

    /// Size of a leg
    pub fn size(&self, leg: Leg) -> f64 {
        match leg {
            Leg::Base => self.base_position_size,
            Leg::Quote => self.quote_position_size,
        }
    }

    /// Exactly one leg open
    pub fn is_unhedged(&self) -> bool {
        self.open_legs.any_open() && !self.open_legs.all_open()
    }

    /// No leg left open; the record only awaits removal
    pub fn is_closed(&self) -> bool {
        !self.open_legs.any_open()
    }
}

/// In-memory view of a ledger over a storage backend.
/// Changes are durable only after [`PositionLedger::persist`].
pub struct PositionLedger<S> {
    store: S,
    positions: IndexMap<String, PositionRecord>,
}

impl<S: LedgerStore> PositionLedger<S> {
    /// Load the ledger from its store
    pub fn load(store: S) -> Result<Self> {
        let positions = store.load()?;
        debug!("Loaded {} positions from {}", positions.len(), store.describe());
        Ok(Self { store, positions })
    }

    /// Record for a pair key
    pub fn get(&self, key: &str) -> Option<&PositionRecord> {
        self.positions.get(key)
    }

    /// Whether a pair key has a record
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Insert or replace a record
    pub fn upsert(&mut self, key: impl Into<String>, record: PositionRecord) {
        self.positions.insert(key.into(), record);
    }

    /// Remove a record, keeping the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<PositionRecord> {
        self.positions.shift_remove(key)
    }

    /// Write the current state to the store
    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.positions)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PositionRecord)> {
        self.positions.iter()
    }

    /// Pair keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Storage backend
    pub fn store(&self) -> &S {
        &self.store
    }
}
