//! Integration tests for full trading cycles with the paper executor

use crate::TestUtils;
use pairs_trading_bot::{
    connectors::{PaperExecutor, TradeSide},
    ledger::{MemoryStore, PositionLedger, PositionRecord, PositionType},
    strategy::{CycleInputs, PairOutcome, PairsTradingEngine},
    Result,
};

const WINDOW: usize = 20;

#[tokio::test]
async fn test_entry_then_exit_across_cycles() -> Result<()> {
    let config = TestUtils::create_test_config(WINDOW);
    let engine = PairsTradingEngine::from_config(PaperExecutor::new(), &config, config.open_trade_policy());
    let store = MemoryStore::new();
    let pairs = vec![TestUtils::pair("BTCUSDT", "ETHUSDT", 0.05)];
    let prices = TestUtils::latest_prices(&[("BTCUSDT", 40000.0), ("ETHUSDT", 2000.0)]);

    // Cycle 1: spread spikes, short the spread
    let spreads = TestUtils::spread_table(&[("BTCUSDT_ETHUSDT", TestUtils::spread_series(WINDOW, 12.0))]);
    let mut ledger = PositionLedger::load(store.clone())?;
    let inputs = CycleInputs {
        spreads: &spreads,
        prices: Some(&prices),
        pairs: &pairs,
    };
    let report = engine.run_cycle(&mut ledger, &inputs).await?;
    assert_eq!(
        report.outcome("BTCUSDT_ETHUSDT"),
        Some(PairOutcome::Entered(PositionType::ShortLong))
    );

    let record = store.snapshot()["BTCUSDT_ETHUSDT"].clone();
    assert!((record.base_position_size - 100.0 / 40000.0).abs() < 1e-15);
    assert!((record.quote_position_size - record.base_position_size * 0.05).abs() < 1e-15);

    // Cycle 2: same spread again, already open, nothing happens
    let mut ledger = PositionLedger::load(store.clone())?;
    let report = engine.run_cycle(&mut ledger, &inputs).await?;
    assert_eq!(report.outcome("BTCUSDT_ETHUSDT"), Some(PairOutcome::Held));

    // Cycle 3: spread reverts past the exit band
    let spreads = TestUtils::spread_table(&[("BTCUSDT_ETHUSDT", TestUtils::spread_series(WINDOW, -1.5))]);
    let inputs = CycleInputs {
        spreads: &spreads,
        prices: Some(&prices),
        pairs: &pairs,
    };
    let mut ledger = PositionLedger::load(store.clone())?;
    let report = engine.run_cycle(&mut ledger, &inputs).await?;
    assert_eq!(report.outcome("BTCUSDT_ETHUSDT"), Some(PairOutcome::Exited));
    assert!(store.snapshot().is_empty());

    let fills = engine.executor().fills().await;
    let sides: Vec<TradeSide> = fills.iter().map(|f| f.order.side).collect();
    assert_eq!(
        sides,
        vec![
            TradeSide::OpenShort,
            TradeSide::OpenLong,
            TradeSide::CloseShort,
            TradeSide::CloseLong
        ]
    );
    assert_eq!(fills[0].order.symbol, "BTCUSDT_UMCBL");
    assert_eq!(fills[3].order.symbol, "ETHUSDT_UMCBL");

    Ok(())
}

#[tokio::test]
async fn test_close_only_ledger_manages_only_its_records() -> Result<()> {
    let config = TestUtils::create_test_config(WINDOW);
    let engine = PairsTradingEngine::from_config(PaperExecutor::new(), &config, config.close_only_policy());

    let mut positions = indexmap::IndexMap::new();
    positions.insert(
        "SOLUSDT_AVAXUSDT".to_string(),
        PositionRecord::new(PositionType::LongShort, -3.2, 1.5, 2.0),
    );
    positions.insert(
        "LINKUSDT_DOTUSDT".to_string(),
        PositionRecord::new(PositionType::ShortLong, 2.8, 4.0, 3.0),
    );
    let store = MemoryStore::with_positions(positions);
    let mut ledger = PositionLedger::load(store.clone())?;

    // Far enough for the close-only band on one pair, inside it on the other,
    // and a spread column with no record that must not be entered
    let spreads = TestUtils::spread_table(&[
        ("SOLUSDT_AVAXUSDT", TestUtils::spread_series(WINDOW, 6.0)),
        ("LINKUSDT_DOTUSDT", TestUtils::spread_series(WINDOW, -1.5)),
        ("BTCUSDT_ETHUSDT", TestUtils::spread_series(WINDOW, 12.0)),
    ]);
    let inputs = CycleInputs {
        spreads: &spreads,
        prices: None,
        pairs: &[],
    };

    let report = engine.run_cycle(&mut ledger, &inputs).await?;

    assert_eq!(report.outcome("SOLUSDT_AVAXUSDT"), Some(PairOutcome::Exited));
    assert_eq!(report.outcome("LINKUSDT_DOTUSDT"), Some(PairOutcome::Held));
    assert_eq!(report.outcome("BTCUSDT_ETHUSDT"), None);
    assert_eq!(ledger.keys(), vec!["LINKUSDT_DOTUSDT"]);
    assert_eq!(store.snapshot().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_rejected_exit_keeps_position() -> Result<()> {
    let config = TestUtils::create_test_config(WINDOW);
    let executor = PaperExecutor::new().with_rejection_probability(1.0).with_seed(1);
    let engine = PairsTradingEngine::from_config(executor, &config, config.open_trade_policy());

    let record = PositionRecord::new(PositionType::ShortLong, 9.0, 0.01, 0.2);
    let mut positions = indexmap::IndexMap::new();
    positions.insert("BTCUSDT_ETHUSDT".to_string(), record.clone());
    let mut ledger = PositionLedger::load(MemoryStore::with_positions(positions))?;

    let spreads = TestUtils::spread_table(&[("BTCUSDT_ETHUSDT", TestUtils::spread_series(WINDOW, -1.5))]);
    let inputs = CycleInputs {
        spreads: &spreads,
        prices: None,
        pairs: &[],
    };

    let report = engine.run_cycle(&mut ledger, &inputs).await?;

    assert_eq!(report.outcome("BTCUSDT_ETHUSDT"), Some(PairOutcome::ExitFailed));
    assert_eq!(ledger.get("BTCUSDT_ETHUSDT"), Some(&record));

    Ok(())
}
