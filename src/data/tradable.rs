//! Tradable-pairs filter by back-test Sharpe ratio

use crate::{PairsTradingError, Result};
use anyhow::Context;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Field of a back-test result holding the Sharpe ratio
pub const SHARPE_FIELD: &str = "SharpeRatio";

/// Markets from `test_results` whose Sharpe ratio is at least `min_sharpe`
/// and which have optimal parameters, mapped to those parameters.
/// Order follows `test_results`.
pub fn select_tradable(
    optimal_parameters: &IndexMap<String, Value>,
    test_results: &IndexMap<String, Value>,
    min_sharpe: f64,
) -> IndexMap<String, Value> {
    let mut tradable = IndexMap::new();

    for (market, results) in test_results {
        let Some(sharpe) = results.get(SHARPE_FIELD).and_then(Value::as_f64) else {
            warn!("No {} for {}, skipping", SHARPE_FIELD, market);
            continue;
        };

        if sharpe < min_sharpe {
            continue;
        }

        if let Some(params) = optimal_parameters.get(market) {
            tradable.insert(market.clone(), params.clone());
        }
    }

    tradable
}

/// Read both JSON inputs, filter, and write the result with 4-space indentation.
/// Returns the number of tradable markets written.
pub fn filter_tradable_pairs<P: AsRef<Path>>(
    optimal_parameters_file: P,
    test_results_file: P,
    output_file: P,
    min_sharpe: f64,
) -> Result<usize> {
    let optimal_parameters = read_json_map(optimal_parameters_file.as_ref())?;
    let test_results = read_json_map(test_results_file.as_ref())?;

    let tradable = select_tradable(&optimal_parameters, &test_results, min_sharpe);
    write_pretty_json(output_file.as_ref(), &tradable)?;

    info!("Tradable pairs saved to {:?} ({} markets)", output_file.as_ref(), tradable.len());
    Ok(tradable.len())
}

fn read_json_map(path: &Path) -> Result<IndexMap<String, Value>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    serde_json::from_reader(file)
        .map_err(|e| PairsTradingError::DataParsing(format!("Failed to parse {:?}: {}", path, e)).into())
}

/// Serialize `value` as JSON indented by four spaces
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut serializer = Serializer::with_formatter(BufWriter::new(file), PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .with_context(|| format!("Failed to write {:?}", path))?;
    serializer.into_inner().flush()?;
    Ok(())
}
