//! Integration tests for the Bitget REST connector against a mock server

use pairs_trading_bot::{
    config::{BotConfig, Credentials},
    connectors::{BitgetConnector, MarketDataSource, OrderExecutor, OrderTemplate, TradeSide},
    Result,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(server: &MockServer) -> BotConfig {
    let mut config = BotConfig::default();
    config.exchange.rest_api_url = server.uri();
    config
}

fn credentials() -> Credentials {
    Credentials {
        api_key: "test-key".to_string(),
        secret_key: "test-secret".to_string(),
        passphrase: "test-passphrase".to_string(),
    }
}

#[tokio::test]
async fn test_place_order_is_signed() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/mix/v1/order/placeOrder"))
        .and(header("ACCESS-KEY", "test-key"))
        .and(header("ACCESS-PASSPHRASE", "test-passphrase"))
        .and(header_exists("ACCESS-SIGN"))
        .and(header_exists("ACCESS-TIMESTAMP"))
        .and(body_partial_json(json!({
            "symbol": "BTCUSDT_UMCBL",
            "marginCoin": "USDT",
            "side": "open_short",
            "orderType": "market",
            "size": "0.0025",
            "timeInForceValue": "normal"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695806875837u64,
            "data": {"clientOid": "pairs_1", "orderId": "1098394695425716224"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let connector = BitgetConnector::new(&config.exchange, Some(credentials()))?;
    let order = OrderTemplate::from(&config.exchange).market("BTCUSDT", TradeSide::OpenShort, 0.00251);

    let response = connector.place_order(&order).await?;
    assert!(response.is_success());
    assert_eq!(response.order_id(), Some("1098394695425716224"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    assert!(body["clientOid"].as_str().unwrap().starts_with("pairs_"));

    Ok(())
}

#[tokio::test]
async fn test_rejection_is_a_failed_response() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/mix/v1/order/placeOrder"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "40762",
            "msg": "The order amount exceeds the balance",
            "requestTime": 1695806875837u64,
            "data": null
        })))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let connector = BitgetConnector::new(&config.exchange, Some(credentials()))?;
    let order = OrderTemplate::from(&config.exchange).market("ETHUSDT", TradeSide::CloseLong, 0.5);

    let response = connector.place_order(&order).await?;
    assert!(!response.is_success());
    assert_eq!(response.code, "40762");

    Ok(())
}

#[tokio::test]
async fn test_history_candles() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("productType", "USDT-FUTURES"))
        .and(query_param("granularity", "1H"))
        .and(query_param("limit", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695865615662u64,
            "data": [
                ["1695839400000", "26200", "26210", "26190", "26205.5", "12.1", "317000.2"],
                ["1695835800000", "26210.5", "26210.5", "26194.5", "26194.5", "26.26", "687897.63"]
            ]
        })))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let connector = BitgetConnector::new(&config.exchange, None)?;

    let candles = connector.history_candles("BTCUSDT", None).await?;
    assert_eq!(candles.len(), 2);
    assert!(candles[0].open_time < candles[1].open_time);
    assert_eq!(candles[1].close, 26205.5);

    Ok(())
}

#[tokio::test]
async fn test_history_candles_api_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "40034",
            "msg": "Parameter symbol does not exist",
            "requestTime": 1695865615662u64,
            "data": null
        })))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let connector = BitgetConnector::new(&config.exchange, None)?;

    let err = connector.history_candles("NOPEUSDT", None).await.unwrap_err();
    assert!(err.to_string().contains("40034"));

    Ok(())
}

#[tokio::test]
async fn test_history_candles_before_end_time() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/mix/market/history-candles"))
        .and(query_param("endTime", "1695835799999"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1695865615662u64,
            "data": [["1695832200000", "26180", "26215", "26170", "26210.5", "9.4"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.exchange.candle_limit = 50;
    let connector = BitgetConnector::new(&config.exchange, None)?;

    let end = chrono::DateTime::from_timestamp_millis(1695835799999).unwrap();
    let candles = connector.history_candles("BTCUSDT", Some(end)).await?;
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].close, 26210.5);

    Ok(())
}
