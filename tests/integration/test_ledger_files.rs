//! Integration tests for the JSON ledger files

use crate::TestUtils;
use pairs_trading_bot::{
    connectors::PaperExecutor,
    ledger::{JsonFileStore, PositionLedger, PositionType},
    strategy::{CycleInputs, PairOutcome, PairsTradingEngine},
    Result,
};
use tempfile::tempdir;

const LEGACY_LEDGER: &str = r#"{
    "BTCUSDT_ETHUSDT": {
        "position_type": "short/long",
        "entry_spread": 1532.75,
        "base_position_size": 0.0025,
        "quote_position_size": 0.0425
    },
    "SOLUSDT_AVAXUSDT": {
        "position_type": "long/short",
        "entry_spread": -4.1,
        "base_position_size": 0.75,
        "quote_position_size": 1.2
    }
}"#;

#[test]
fn test_legacy_ledger_loads_in_order() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("open_positions.json");
    std::fs::write(&path, LEGACY_LEDGER)?;

    let ledger = PositionLedger::load(JsonFileStore::new(&path))?;

    assert_eq!(ledger.keys(), vec!["BTCUSDT_ETHUSDT", "SOLUSDT_AVAXUSDT"]);
    let record = ledger.get("SOLUSDT_AVAXUSDT").unwrap();
    assert_eq!(record.position_type, PositionType::LongShort);
    assert!(!record.is_unhedged());

    // Rewriting an untouched ledger keeps the legacy layout
    ledger.persist()?;
    let rewritten: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let original: serde_json::Value = serde_json::from_str(LEGACY_LEDGER)?;
    assert_eq!(rewritten, original);

    Ok(())
}

#[test]
fn test_missing_and_corrupt_ledgers() -> Result<()> {
    let dir = tempdir()?;

    let missing = PositionLedger::load(JsonFileStore::new(dir.path().join("close_only.json")))?;
    assert!(missing.is_empty());

    let corrupt = dir.path().join("open_positions.json");
    std::fs::write(&corrupt, "{\"BTCUSDT_ETHUSDT\": {\"position_type\": \"sideways\"}}")?;
    assert!(PositionLedger::load(JsonFileStore::new(&corrupt)).is_err());

    Ok(())
}

#[tokio::test]
async fn test_cycle_persists_to_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("open_positions.json");
    std::fs::write(&path, LEGACY_LEDGER)?;

    let window = 20;
    let config = TestUtils::create_test_config(window);
    let engine = PairsTradingEngine::from_config(PaperExecutor::new(), &config, config.open_trade_policy());

    // short/long exits at z <= -1, long/short has no spread column and is skipped
    let spreads = TestUtils::spread_table(&[("BTCUSDT_ETHUSDT", TestUtils::spread_series(window, -1.5))]);
    let inputs = CycleInputs {
        spreads: &spreads,
        prices: None,
        pairs: &[],
    };

    let mut ledger = PositionLedger::load(JsonFileStore::new(&path))?;
    let report = engine.run_cycle(&mut ledger, &inputs).await?;

    assert_eq!(report.outcome("BTCUSDT_ETHUSDT"), Some(PairOutcome::Exited));
    assert_eq!(report.outcome("SOLUSDT_AVAXUSDT"), Some(PairOutcome::Skipped));

    let reloaded = PositionLedger::load(JsonFileStore::new(&path))?;
    assert_eq!(reloaded.keys(), vec!["SOLUSDT_AVAXUSDT"]);

    let content = std::fs::read_to_string(&path)?;
    assert!(content.starts_with("{\n    \"SOLUSDT_AVAXUSDT\": {\n"));

    Ok(())
}
