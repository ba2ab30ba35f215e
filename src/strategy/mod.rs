//! Signal generation and the trading engine

pub mod engine;
pub mod signal;
pub mod zscore;

pub use engine::{CycleInputs, CycleReport, ExitCompletion, PairOutcome, PairsTradingEngine};
pub use signal::{PairState, Signal, SignalPolicy};
pub use zscore::{latest_zscore, rolling_zscore};
