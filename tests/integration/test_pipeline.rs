//! Integration tests for the data pipeline: candles to prices to spreads

use pairs_trading_bot::{
    config::BotConfig,
    connectors::ConnectorFactory,
    data::{calculate_spreads, filter_tradable_pairs, load_pairs, MarketDataFetcher, PriceTable, SpreadTable},
    strategy::latest_zscore,
    Result,
};
use serde_json::json;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_candles(server: &MockServer, symbol: &str, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .and(query_param("symbol", symbol))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695865615662u64,
            "data": rows
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_then_calculate_spreads() -> Result<()> {
    let server = MockServer::start().await;
    mount_candles(
        &server,
        "BTCUSDT",
        json!([
            ["1704067200000", "0", "0", "0", "42000", "1"],
            ["1704070800000", "0", "0", "0", "42100", "1"],
            ["1704074400000", "0", "0", "0", "42050", "1"]
        ]),
    )
    .await;
    mount_candles(
        &server,
        "ETHUSDT",
        json!([
            ["1704070800000", "0", "0", "0", "2300", "1"],
            ["1704074400000", "0", "0", "0", "2290", "1"]
        ]),
    )
    .await;

    let dir = tempdir()?;
    let mut config = BotConfig::default();
    config.exchange.rest_api_url = server.uri();
    config.exchange.markets = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];

    let source = ConnectorFactory::create_market_data_source(&config)?;
    let mut fetcher = MarketDataFetcher::new(source, Duration::ZERO);
    let prices = fetcher.fetch_prices(&config.exchange.markets).await?;

    let price_file = dir.path().join("data.csv");
    prices.write_csv(&price_file)?;
    let content = std::fs::read_to_string(&price_file)?;
    assert!(content.starts_with("time,BTCUSDT,ETHUSDT\n2024-01-01 00:00:00,42000,\n2024-01-01 01:00:00,42100,2300\n"));

    let pairs_file = dir.path().join("cointegrated_pairs.csv");
    std::fs::write(&pairs_file, "Base,Quote,HedgeRatio\nBTCUSDT,ETHUSDT,18.0\n")?;
    let pairs = load_pairs(&pairs_file)?.expect("pairs file exists");

    let prices = PriceTable::read_csv(&price_file)?;
    let spreads = calculate_spreads(&prices, &pairs)?;
    let spread_file = dir.path().join("spreads.csv");
    spreads.write_csv(&spread_file)?;

    let spreads = SpreadTable::read_csv(&spread_file)?;
    assert_eq!(
        spreads.series("BTCUSDT_ETHUSDT").unwrap(),
        &[None, Some(42100.0 - 18.0 * 2300.0), Some(42050.0 - 18.0 * 2290.0)]
    );

    Ok(())
}

/// Hourly candle rows for `hours`, newest first as the exchange sends them
fn candle_rows(hours: std::ops::Range<i64>) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = hours
        .rev()
        .map(|h| {
            let close = 42000.0 + (h % 11) as f64 * 5.0;
            json!([(START_MS + h * HOUR_MS).to_string(), "0", "0", "0", close.to_string(), "1"])
        })
        .collect();
    json!(rows)
}

const START_MS: i64 = 1_704_067_200_000;
const HOUR_MS: i64 = 3_600_000;

#[tokio::test]
async fn test_fetch_pages_back_to_cover_the_window() -> Result<()> {
    let server = MockServer::start().await;
    let page_end = (START_MS + 200 * HOUR_MS - 1).to_string();

    // Older page, requested with endTime just before the newest page
    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .and(query_param("endTime", page_end.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695865615662u64,
            "data": candle_rows(0..200)
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Newest page
    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .and(query_param("limit", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695865615662u64,
            "data": candle_rows(200..400)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = BotConfig::default();
    config.exchange.rest_api_url = server.uri();
    config.exchange.candles_per_market = 300;
    let window = config.strategy.window;

    let source = ConnectorFactory::create_market_data_source(&config)?;
    let mut fetcher =
        MarketDataFetcher::new(source, Duration::ZERO).with_candles_per_market(config.exchange.candles_per_market);
    let prices = fetcher.fetch_prices(&["BTCUSDT".to_string()]).await?;

    assert_eq!(prices.len(), 300);
    assert!(prices.len() >= window);
    let series = prices.series("BTCUSDT").unwrap();
    assert!(latest_zscore(series, window).is_some());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "endTime"));
    assert!(requests[1]
        .url
        .query_pairs()
        .any(|(k, v)| k == "endTime" && v == page_end.as_str()));

    Ok(())
}

#[test]
fn test_filter_pairs_files() -> Result<()> {
    let dir = tempdir()?;
    let optimal = dir.path().join("optimal_parameters.json");
    let results = dir.path().join("test_results.json");
    let output = dir.path().join("tradable_pairs.json");

    std::fs::write(
        &optimal,
        r#"{
            "BTCUSDT_ETHUSDT": {"window": 200, "entry_z": 3.0, "exit_z": 1.0},
            "SOLUSDT_AVAXUSDT": {"window": 150, "entry_z": 2.5, "exit_z": 0.5}
        }"#,
    )?;
    std::fs::write(
        &results,
        r#"{
            "BTCUSDT_ETHUSDT": {"SharpeRatio": 1.2, "TotalReturn": 0.18},
            "SOLUSDT_AVAXUSDT": {"SharpeRatio": 0.5, "TotalReturn": 0.02}
        }"#,
    )?;

    let count = filter_tradable_pairs(&optimal, &results, &output, 1.0)?;
    assert_eq!(count, 1);

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(
        written,
        json!({"BTCUSDT_ETHUSDT": {"window": 200, "entry_z": 3.0, "exit_z": 1.0}})
    );

    Ok(())
}
