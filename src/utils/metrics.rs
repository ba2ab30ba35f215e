//! Prometheus metrics

use crate::{trading::Leg, PairsTradingError, Result};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Install the Prometheus exporter with an HTTP listener on `addr`
pub fn init_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| PairsTradingError::Config(format!("Failed to install metrics exporter: {}", e)))?;

    info!("Prometheus metrics listening on {}", addr);
    Ok(())
}

/// Count a finished order leg by outcome
pub fn record_order(leg: Leg, succeeded: bool) {
    let outcome = if succeeded { "filled" } else { "failed" };
    counter!("pairs_orders_total", 1, "leg" => leg.to_string(), "outcome" => outcome);
}

/// Count a non-hold signal
pub fn record_signal(pair: &str, signal: &str) {
    counter!("pairs_signals_total", 1, "pair" => pair.to_string(), "signal" => signal.to_string());
}

/// Latest z-score seen for a pair
pub fn record_zscore(pair: &str, zscore: f64) {
    gauge!("pairs_zscore", zscore, "pair" => pair.to_string());
}

/// Number of records in a ledger after a cycle
pub fn record_ledger_size(ledger: &str, size: usize) {
    gauge!("pairs_ledger_records", size as f64, "ledger" => ledger.to_string());
}
