//! Bitget USDT-margined futures connector implementation

use crate::{
    config::{Credentials, ExchangeConfig},
    connectors::traits::*,
    PairsTradingError, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Order placement endpoint
pub const PLACE_ORDER_PATH: &str = "/api/mix/v1/order/placeOrder";

/// History candles endpoint
pub const HISTORY_CANDLES_PATH: &str = "/api/v2/mix/market/history-candles";

/// Bitget REST connector
pub struct BitgetConnector {
    base_url: Url,
    credentials: Option<Credentials>,
    product_type: String,
    granularity: String,
    candle_limit: u32,
    size_decimals: u32,
    client: reqwest::Client,
}

impl BitgetConnector {
    /// Create a new connector. Credentials are only needed for order placement.
    pub fn new(config: &ExchangeConfig, credentials: Option<Credentials>) -> Result<Self> {
        let base_url = Url::parse(&config.rest_api_url)
            .map_err(|e| PairsTradingError::Config(format!("Invalid REST API URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.connection_timeout_secs))
            .build()
            .map_err(|e| PairsTradingError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            credentials,
            product_type: config.product_type.clone(),
            granularity: config.granularity.clone(),
            candle_limit: config.candle_limit,
            size_decimals: config.size_decimals,
            client,
        })
    }

    /// Request signature: base64(HMAC-SHA256(secret, ts + METHOD + path + body))
    pub fn sign(
        secret: &str,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PairsTradingError::Config(format!("Invalid secret key: {}", e)))?;
        mac.update(timestamp.as_bytes());
        mac.update(method.to_uppercase().as_bytes());
        mac.update(request_path.as_bytes());
        mac.update(body.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PairsTradingError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }

    fn credentials(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            PairsTradingError::Config("Order placement requires API credentials".to_string()).into()
        })
    }
}

#[async_trait]
impl OrderExecutor for BitgetConnector {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        let credentials = self.credentials()?;

        let payload = BitgetPlaceOrder {
            symbol: &order.symbol,
            margin_coin: &order.margin_coin,
            size: format_size(order.size, self.size_decimals)?,
            side: order.side,
            order_type: order.order_type,
            time_in_force_value: &order.time_in_force,
            client_oid: format!("pairs_{}", uuid::Uuid::new_v4().simple()),
        };
        let body = serde_json::to_string(&payload)
            .map_err(|e| PairsTradingError::DataParsing(format!("Failed to encode order: {}", e)))?;

        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = Self::sign(&credentials.secret_key, &timestamp, "POST", PLACE_ORDER_PATH, &body)?;

        debug!("Placing order: {}", body);

        let response = self
            .client
            .post(self.endpoint(PLACE_ORDER_PATH)?)
            .header("ACCESS-KEY", &credentials.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", &timestamp)
            .header("ACCESS-PASSPHRASE", &credentials.passphrase)
            .header("Content-Type", "application/json")
            .header("locale", "en-US")
            .body(body)
            .send()
            .await
            .map_err(|e| PairsTradingError::Connection(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PairsTradingError::Connection(format!("Failed to read response: {}", e)))?;

        // Rejections come back as 4xx with the usual {code, msg} envelope.
        let parsed: OrderResponse = serde_json::from_str(&text).map_err(|e| {
            PairsTradingError::DataParsing(format!(
                "Failed to parse order response (HTTP {}): {} - {}",
                status, e, text
            ))
        })?;

        if !parsed.is_success() {
            warn!("Bitget rejected order on {}: {} - {}", order.symbol, parsed.code, parsed.msg);
        }

        Ok(parsed)
    }
}

#[async_trait]
impl MarketDataSource for BitgetConnector {
    async fn history_candles(&self, symbol: &str, end_time: Option<DateTime<Utc>>) -> Result<Vec<Candle>> {
        let mut url = self.endpoint(HISTORY_CANDLES_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("symbol", symbol)
                .append_pair("productType", &self.product_type)
                .append_pair("granularity", &self.granularity)
                .append_pair("limit", &self.candle_limit.to_string());
            if let Some(end) = end_time {
                query.append_pair("endTime", &end.timestamp_millis().to_string());
            }
        }

        debug!("Fetching candles: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PairsTradingError::Connection(format!("HTTP request failed: {}", e)))?;

        let envelope: BitgetResponse<Option<Vec<Vec<String>>>> = response
            .json()
            .await
            .map_err(|e| PairsTradingError::DataParsing(format!("Failed to parse candles: {}", e)))?;

        if envelope.code != SUCCESS_CODE {
            return Err(PairsTradingError::Exchange {
                code: envelope.code,
                msg: envelope.msg,
            }
            .into());
        }

        let mut candles = envelope
            .data
            .unwrap_or_default()
            .iter()
            .map(|row| parse_candle_row(row))
            .collect::<Result<Vec<_>>>()?;

        candles.sort_by_key(|c| c.open_time);
        Ok(candles)
    }
}

fn parse_candle_row(row: &[String]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(PairsTradingError::DataParsing(format!(
            "Candle row has {} fields, expected at least 6",
            row.len()
        ))
        .into());
    }

    let field = |idx: usize, name: &str| -> Result<f64> {
        row[idx].parse::<f64>().map_err(|e| {
            PairsTradingError::DataParsing(format!("Invalid candle {} '{}': {}", name, row[idx], e)).into()
        })
    };

    let millis: i64 = row[0]
        .parse()
        .map_err(|e| PairsTradingError::DataParsing(format!("Invalid candle time '{}': {}", row[0], e)))?;
    let open_time = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| PairsTradingError::DataParsing(format!("Candle time out of range: {}", millis)))?;

    Ok(Candle {
        open_time,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}

// Bitget API request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BitgetPlaceOrder<'a> {
    symbol: &'a str,
    margin_coin: &'a str,
    size: String,
    side: TradeSide,
    order_type: OrderType,
    time_in_force_value: &'a str,
    client_oid: String,
}

#[derive(Debug, Deserialize)]
struct BitgetResponse<T> {
    code: String,
    msg: String,
    data: T,
}
