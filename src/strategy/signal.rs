//! Per-pair state machine driven by the latest z-score

use crate::ledger::{PositionRecord, PositionType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a pair as seen from its ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    /// No record
    Flat,
    /// Hedged `short/long` record
    OpenShortLong,
    /// Hedged `long/short` record
    OpenLongShort,
    /// Record with only one leg still open
    Unhedged,
}

impl PairState {
    /// Derive the state from a ledger record
    pub fn from_record(record: Option<&PositionRecord>) -> Self {
        match record {
            None => PairState::Flat,
            Some(r) if r.is_unhedged() => PairState::Unhedged,
            Some(r) => match r.position_type {
                PositionType::ShortLong => PairState::OpenShortLong,
                PositionType::LongShort => PairState::OpenLongShort,
            },
        }
    }
}

/// What to do with a pair this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// No action
    Hold,
    /// Open a position of the given direction
    Enter(PositionType),
    /// Close every open leg of the recorded position
    Exit,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "hold"),
            Signal::Enter(PositionType::ShortLong) => write!(f, "enter_short_long"),
            Signal::Enter(PositionType::LongShort) => write!(f, "enter_long_short"),
            Signal::Exit => write!(f, "exit"),
        }
    }
}

/// Thresholds shared by the open-trade and close-only ledgers.
/// Without `entry_z` the policy never opens positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPolicy {
    /// Rolling window in samples
    pub window: usize,
    /// Absolute z-score a flat pair must exceed to be entered
    pub entry_z: Option<f64>,
    /// Absolute z-score an open pair must reach on the far side to be exited
    pub exit_z: f64,
}

impl SignalPolicy {
    /// Policy that may enter and exit
    pub fn open_trades(window: usize, entry_z: f64, exit_z: f64) -> Self {
        Self {
            window,
            entry_z: Some(entry_z),
            exit_z,
        }
    }

    /// Policy that only exits
    pub fn close_only(window: usize, exit_z: f64) -> Self {
        Self {
            window,
            entry_z: None,
            exit_z,
        }
    }

    /// Whether flat pairs can be entered
    pub fn allows_entry(&self) -> bool {
        self.entry_z.is_some()
    }

    /// Decide the action for `state` given the latest z-score
    pub fn decide(&self, state: PairState, zscore: Option<f64>) -> Signal {
        let Some(z) = zscore else {
            return Signal::Hold;
        };

        match state {
            PairState::Flat => match self.entry_z {
                Some(entry) if z > entry => Signal::Enter(PositionType::ShortLong),
                Some(entry) if z < -entry => Signal::Enter(PositionType::LongShort),
                _ => Signal::Hold,
            },
            PairState::OpenShortLong if z <= -self.exit_z => Signal::Exit,
            PairState::OpenLongShort if z >= self.exit_z => Signal::Exit,
            PairState::Unhedged => Signal::Exit,
            _ => Signal::Hold,
        }
    }
}
