//! 거래소 중립 타입 정의.
//!
//! Coinbase, Binance, Kraken, KuCoin 등 거래소마다 다른 응답을
//! 통일된 형식으로 표현하기 위한 정규(canonical) 타입입니다.
//!
//! 각 거래소의 serde 타입은 `gateway-exchange` 크레이트 내부에 유지되며,
//! 어댑터 경계를 넘는 것은 이 모듈의 타입뿐입니다.
//!
//! 모든 금액/수량은 `Decimal`이며 직렬화 시 문자열로 표현됩니다.

use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// 현재 시각 (Unix 밀리초).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// 잔고
// =============================================================================

/// 통화별 잔고.
///
/// `total`은 항상 `available + locked`입니다. 가용/동결 금액을 구분할 수 없는
/// 거래소는 `locked = 0`으로 보고합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    currency: String,
    available: Decimal,
    locked: Decimal,
    total: Decimal,
}

impl Balance {
    /// 새 잔고 생성. `total`은 자동 계산됩니다.
    pub fn new(currency: impl Into<String>, available: Decimal, locked: Decimal) -> Self {
        Self {
            currency: currency.into(),
            available,
            locked,
            total: available + locked,
        }
    }

    /// 동결 금액을 구분할 수 없는 거래소용 생성자.
    pub fn available_only(currency: impl Into<String>, available: Decimal) -> Self {
        Self::new(currency, available, Decimal::ZERO)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn available(&self) -> Decimal {
        self.available
    }

    pub fn locked(&self) -> Decimal {
        self.locked
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// 잔고가 0인지 여부.
    pub fn is_zero(&self) -> bool {
        self.total.is_zero()
    }
}

// =============================================================================
// 시세
// =============================================================================

/// 24시간 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// 요청한 심볼
    pub symbol: String,
    /// 최근 체결가
    pub price: Decimal,
    /// 24시간 변동 (거래소가 제공하는 값, 대부분 %)
    pub change_24h: Decimal,
    /// 24시간 거래량
    pub volume_24h: Decimal,
    /// 24시간 고가
    pub high_24h: Decimal,
    /// 24시간 저가
    pub low_24h: Decimal,
    /// 조회 시각 (Unix 밀리초)
    pub timestamp: i64,
}

// =============================================================================
// 호가
// =============================================================================

/// 호가 한 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// 호가창 스냅샷.
///
/// `bids`, `asks` 모두 최우선 호가가 맨 앞입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp: i64,
}

impl OrderBookSnapshot {
    /// 깊이 제한 적용 (각 방향 최대 `depth` 단계).
    pub fn truncated(mut self, depth: Option<usize>) -> Self {
        if let Some(depth) = depth {
            self.bids.truncate(depth);
            self.asks.truncate(depth);
        }
        self
    }

    /// 최우선 매수 호가.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// 최우선 매도 호가.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }
}

// =============================================================================
// 주문
// =============================================================================

/// 매수/매도 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// 거래소 응답 문자열 변환 (대소문자 무시).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(Self::Buy),
            "sell" | "ask" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
        }
    }

    /// 거래소 응답 문자열 변환. 지정가 계열이 아니면 시장가로 취급합니다.
    pub fn parse(raw: &str) -> Self {
        if raw.to_ascii_lowercase().contains("limit") {
            Self::Limit
        } else {
            Self::Market
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 주문 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Partial,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// 거래소별 고정 상태 테이블로 변환.
    ///
    /// 테이블에 없는 상태 문자열은 `Open`으로 취급합니다.
    pub fn from_table(table: &[(&str, OrderStatus)], raw: &str) -> Self {
        table
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, status)| *status)
            .unwrap_or(Self::Open)
    }
}

/// 주문 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    /// 주문 시각 (Unix 밀리초)
    pub timestamp: i64,
}

/// 주문 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl OrderRequest {
    /// 시장가 주문 요청.
    pub fn market(symbol: impl Into<String>, side: OrderSide, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
        }
    }

    /// 지정가 주문 요청.
    pub fn limit(symbol: impl Into<String>, side: OrderSide, amount: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
        }
    }

    /// 주문 요청 검증.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(GatewayError::validation("주문 심볼이 비어 있습니다"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(GatewayError::validation(format!(
                "주문 수량은 0보다 커야 합니다: {}",
                self.amount
            )));
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err(GatewayError::validation(
                "지정가 주문에는 가격이 필요합니다",
            )),
            (_, Some(price)) if price <= Decimal::ZERO => Err(GatewayError::validation(format!(
                "주문 가격은 0보다 커야 합니다: {}",
                price
            ))),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// 체결
// =============================================================================

/// 체결 내역.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    /// 체결 시각 (Unix 밀리초)
    pub timestamp: i64,
}

// =============================================================================
// 거래쌍
// =============================================================================

/// 거래 가능한 심볼 정보. 수량 제한은 거래소가 제공할 때만 채워집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_qty: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_qty: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_size: Option<Decimal>,
}
