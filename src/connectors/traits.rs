//! Exchange connector traits and common types

use crate::{PairsTradingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Response code the exchange uses for an accepted request
pub const SUCCESS_CODE: &str = "00000";

/// Response message the exchange uses for an accepted request
pub const SUCCESS_MSG: &str = "success";

/// Order placement boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Place an order. `Err` means the call itself failed (transport,
    /// undecodable body); a rejected order is an `Ok` response whose
    /// `is_success()` is false.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse>;
}

#[async_trait]
impl<T: OrderExecutor + ?Sized> OrderExecutor for Box<T> {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        (**self).place_order(order).await
    }
}

/// Historical candle source
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch one page of history candles for a market, oldest first.
    /// With `end_time` set, only candles opening at or before it are returned.
    async fn history_candles(&self, symbol: &str, end_time: Option<DateTime<Utc>>) -> Result<Vec<Candle>>;
}

/// Trade side on a one-way futures account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// Open a long position
    OpenLong,
    /// Open a short position
    OpenShort,
    /// Close a long position
    CloseLong,
    /// Close a short position
    CloseShort,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::OpenLong => write!(f, "open_long"),
            TradeSide::OpenShort => write!(f, "open_short"),
            TradeSide::CloseLong => write!(f, "close_long"),
            TradeSide::CloseShort => write!(f, "close_short"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Market order
    Market,
    /// Limit order
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

/// Order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Contract symbol, e.g. `BTCUSDT_UMCBL`
    pub symbol: String,
    /// Margin coin, e.g. `USDT`
    pub margin_coin: String,
    /// Trade side
    pub side: TradeSide,
    /// Order type
    pub order_type: OrderType,
    /// Order size in base units
    pub size: f64,
    /// Time in force
    pub time_in_force: String,
}

/// Fields shared by every order the bot sends
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTemplate {
    /// Margin coin
    pub margin_coin: String,
    /// Suffix appended to a market symbol to form the contract symbol
    pub symbol_suffix: String,
    /// Time in force
    pub time_in_force: String,
    /// Decimal places kept when formatting order sizes
    pub size_decimals: u32,
}

impl OrderTemplate {
    /// Size as the exchange would receive it; an error if it is not a
    /// positive amount at the configured precision
    pub fn format_size(&self, size: f64) -> Result<String> {
        format_size(size, self.size_decimals)
    }

    /// Build a market order for `market` (e.g. `BTCUSDT`)
    pub fn market(&self, market: &str, side: TradeSide, size: f64) -> OrderRequest {
        OrderRequest {
            symbol: format!("{}{}", market, self.symbol_suffix),
            margin_coin: self.margin_coin.clone(),
            side,
            order_type: OrderType::Market,
            size,
            time_in_force: self.time_in_force.clone(),
        }
    }
}

impl From<&crate::config::ExchangeConfig> for OrderTemplate {
    fn from(config: &crate::config::ExchangeConfig) -> Self {
        Self {
            margin_coin: config.margin_coin.clone(),
            symbol_suffix: config.symbol_suffix.clone(),
            time_in_force: config.time_in_force.clone(),
            size_decimals: config.size_decimals,
        }
    }
}

/// Render an order size with at most `decimals` places, rounding toward zero
pub fn format_size(size: f64, decimals: u32) -> Result<String> {
    let value = Decimal::from_f64(size)
        .filter(|d| d.is_sign_positive() && !d.is_zero())
        .ok_or_else(|| PairsTradingError::Trading(format!("Invalid order size: {}", size)))?;

    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    if rounded.is_zero() {
        return Err(PairsTradingError::Trading(format!(
            "Order size {} rounds to zero at {} decimals",
            size, decimals
        ))
        .into());
    }
    Ok(rounded.normalize().to_string())
}

/// Order response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Provider response code
    pub code: String,
    /// Provider message
    pub msg: String,
    /// Payload, present on success
    #[serde(default)]
    pub data: Option<OrderData>,
}

/// Order response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderData {
    /// Exchange order ID
    #[serde(rename = "orderId")]
    pub order_id: String,
    /// Client order ID
    #[serde(rename = "clientOid", default)]
    pub client_oid: Option<String>,
}

impl OrderResponse {
    /// Build an accepted response
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            msg: SUCCESS_MSG.to_string(),
            data: Some(OrderData {
                order_id: order_id.into(),
                client_oid: None,
            }),
        }
    }

    /// Build a rejected response
    pub fn rejected(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            msg: msg.into(),
            data: None,
        }
    }

    /// Whether the exchange accepted the order
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE && self.msg == SUCCESS_MSG
    }

    /// Exchange order ID, if any
    pub fn order_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.order_id.as_str())
    }
}

/// One OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub open_time: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume in base units
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_side_display() {
        assert_eq!(TradeSide::OpenLong.to_string(), "open_long");
        assert_eq!(TradeSide::CloseShort.to_string(), "close_short");
        assert_eq!(
            serde_json::to_string(&TradeSide::OpenShort).unwrap(),
            "\"open_short\""
        );
    }

    #[test]
    fn test_order_type_display() {
        assert_eq!(OrderType::Market.to_string(), "market");
        assert_eq!(OrderType::Limit.to_string(), "limit");
    }

    #[test]
    fn test_success_requires_code_and_msg() {
        assert!(OrderResponse::accepted("1").is_success());

        let wrong_msg = OrderResponse {
            code: SUCCESS_CODE.to_string(),
            msg: "pending".to_string(),
            data: None,
        };
        assert!(!wrong_msg.is_success());
        assert!(!OrderResponse::rejected("40762", "success").is_success());
    }

    #[test]
    fn test_parse_exchange_response() {
        let body = r#"{"code":"00000","msg":"success","requestTime":1695806875837,"data":{"clientOid":"abc","orderId":"1098394695425716224"}}"#;
        let response: OrderResponse = serde_json::from_str(body).unwrap();
        assert!(response.is_success());
        assert_eq!(response.order_id(), Some("1098394695425716224"));

        let body = r#"{"code":"40762","msg":"The order amount exceeds the balance","requestTime":1695806875837,"data":null}"#;
        let response: OrderResponse = serde_json::from_str(body).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.order_id(), None);
    }

    #[test]
    fn test_template_builds_contract_symbol() {
        let template = OrderTemplate {
            margin_coin: "USDT".to_string(),
            symbol_suffix: "_UMCBL".to_string(),
            time_in_force: "normal".to_string(),
            size_decimals: 2,
        };
        let order = template.market("ETHUSDT", TradeSide::OpenLong, 0.5);
        assert_eq!(order.symbol, "ETHUSDT_UMCBL");
        assert_eq!(order.margin_coin, "USDT");
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.size, 0.5);

        assert_eq!(template.format_size(0.509).unwrap(), "0.5");
        assert!(template.format_size(0.009).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0.123456, 4).unwrap(), "0.1234");
        assert_eq!(format_size(2.0, 4).unwrap(), "2");
        assert!(format_size(0.00001, 4).is_err());
        assert!(format_size(-1.0, 4).is_err());
        assert!(format_size(f64::NAN, 4).is_err());
    }
}
