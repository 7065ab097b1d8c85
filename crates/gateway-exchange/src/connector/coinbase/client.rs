//! Coinbase Advanced Trade REST 어댑터.
//!
//! # 서명 방식
//!
//! `CB-ACCESS-SIGN = hex(HMAC-SHA256(secret, timestamp + METHOD + requestPath + body))`
//!
//! - timestamp: Unix 초
//! - requestPath: `/api/v3/brokerage` + 엔드포인트 (쿼리 포함)
//! - body: JSON 본문, 없으면 빈 문자열

use async_trait::async_trait;
use gateway_core::{
    now_millis, Balance, ExchangeAdapter, ExchangeCredentials, ExchangeKind, GatewayError,
    GatewayResult, Order, OrderBookSnapshot, OrderRequest, OrderSide, OrderStatus, OrderType,
    PriceLevel, Ticker, Trade, UpstreamError,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    http::{AdapterOptions, HttpTransport},
    parse::{decimal, opt_decimal, rfc3339_millis, side},
    sign::hmac_sha256_hex,
};

const EXCHANGE: ExchangeKind = ExchangeKind::Coinbase;
const BASE_URL: &str = "https://api.coinbase.com/api/v3/brokerage";
const SANDBOX_URL: &str = "https://api-public.sandbox.exchange.coinbase.com";
const REQUEST_PATH_PREFIX: &str = "/api/v3/brokerage";

/// Coinbase 주문 상태 → 정규 상태.
pub const ORDER_STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("OPEN", OrderStatus::Open),
    ("PENDING", OrderStatus::Open),
    ("QUEUED", OrderStatus::Open),
    ("CANCEL_QUEUED", OrderStatus::Open),
    ("FILLED", OrderStatus::Filled),
    ("CANCELLED", OrderStatus::Cancelled),
    ("EXPIRED", OrderStatus::Cancelled),
    ("FAILED", OrderStatus::Cancelled),
];

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct CoinbaseAccounts {
    accounts: Vec<CoinbaseAccount>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseAccount {
    currency: String,
    available_balance: CoinbaseAmount,
    hold: CoinbaseAmount,
}

#[derive(Debug, Deserialize)]
struct CoinbaseAmount {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: String,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseBook {
    bids: Vec<CoinbaseBookEntry>,
    asks: Vec<CoinbaseBookEntry>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseBookEntry {
    price: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseCreateResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    success_response: Option<CoinbaseOrderId>,
    #[serde(default)]
    error_response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseOrderId {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseOrderEnvelope {
    order: CoinbaseOrder,
}

#[derive(Debug, Deserialize)]
struct CoinbaseOrders {
    orders: Vec<CoinbaseOrder>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinbaseOrderConfiguration {
    #[serde(default)]
    limit_limit_gtc: Option<CoinbaseLimitConfig>,
    #[serde(default)]
    market_market_ioc: Option<CoinbaseMarketConfig>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseLimitConfig {
    #[serde(default)]
    base_size: Option<String>,
    #[serde(default)]
    limit_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseMarketConfig {
    #[serde(default)]
    base_size: Option<String>,
    #[serde(default)]
    quote_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoinbaseOrder {
    order_id: String,
    product_id: String,
    #[serde(default)]
    order_type: Option<String>,
    side: String,
    #[serde(default)]
    order_configuration: CoinbaseOrderConfiguration,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    price: Option<String>,
    status: String,
    created_time: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseFills {
    fills: Vec<CoinbaseFill>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseFill {
    trade_id: String,
    product_id: String,
    side: String,
    size: String,
    price: String,
    commission: String,
    trade_time: String,
}

impl CoinbaseOrder {
    /// 정규 주문으로 변환.
    ///
    /// 수량/가격은 지정가 설정값을 우선하고, 없으면 주문 최상위 필드를 사용합니다.
    pub(crate) fn into_order(self) -> GatewayResult<Order> {
        let config = &self.order_configuration;
        let limit = config.limit_limit_gtc.as_ref();
        let market = config.market_market_ioc.as_ref();

        let order_type = match self.order_type.as_deref() {
            Some(raw) => OrderType::parse(raw),
            None if limit.is_some() => OrderType::Limit,
            None => OrderType::Market,
        };

        let amount = limit
            .and_then(|c| c.base_size.as_deref())
            .or(self.size.as_deref())
            .or_else(|| market.and_then(|c| c.base_size.as_deref()))
            .or_else(|| market.and_then(|c| c.quote_size.as_deref()));
        let price = limit
            .and_then(|c| c.limit_price.as_deref())
            .or(self.price.as_deref());

        Ok(Order {
            id: self.order_id,
            symbol: self.product_id,
            order_type,
            side: side(EXCHANGE, &self.side)?,
            amount: opt_decimal(EXCHANGE, amount)?.unwrap_or(Decimal::ZERO),
            price: opt_decimal(EXCHANGE, price)?,
            status: OrderStatus::from_table(ORDER_STATUS_TABLE, &self.status),
            timestamp: rfc3339_millis(&self.created_time),
        })
    }
}

/// 서명 원문 생성.
pub(crate) fn prehash(timestamp: &str, method: &Method, endpoint: &str, body: &str) -> String {
    format!(
        "{}{}{}{}{}",
        timestamp,
        method.as_str().to_uppercase(),
        REQUEST_PATH_PREFIX,
        endpoint,
        body
    )
}

/// 주문 생성 요청 본문.
fn order_payload(request: &OrderRequest) -> Value {
    let amount = request.amount.to_string();
    let configuration = match request.order_type {
        OrderType::Market => {
            // 시장가 매수는 견적 통화 금액, 매도는 기준 통화 수량
            let size_field = match request.side {
                OrderSide::Buy => "quote_size",
                OrderSide::Sell => "base_size",
            };
            json!({ "market_market_ioc": { size_field: amount } })
        }
        OrderType::Limit => json!({
            "limit_limit_gtc": {
                "base_size": amount,
                "limit_price": request.price.map(|p| p.to_string()),
            }
        }),
    };

    json!({
        "product_id": request.symbol,
        "side": request.side.as_str().to_uppercase(),
        "order_configuration": configuration,
    })
}

// ============================================================================
// Coinbase 클라이언트
// ============================================================================

pub struct CoinbaseClient {
    http: HttpTransport,
    base_url_override: Option<String>,
    credentials: Option<ExchangeCredentials>,
}

impl CoinbaseClient {
    pub fn new(options: AdapterOptions) -> GatewayResult<Self> {
        Ok(Self {
            http: HttpTransport::new(EXCHANGE, options.timeout)?,
            base_url_override: options.base_url,
            credentials: None,
        })
    }

    fn credentials(&self) -> GatewayResult<&ExchangeCredentials> {
        self.credentials.as_ref().ok_or_else(|| GatewayError::NotConfigured {
            exchange: EXCHANGE.to_string(),
        })
    }

    fn base_url(&self, credentials: &ExchangeCredentials) -> &str {
        match &self.base_url_override {
            Some(url) => url,
            None if credentials.sandbox() => SANDBOX_URL,
            None => BASE_URL,
        }
    }

    /// 서명 요청 전송.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> GatewayResult<T> {
        let credentials = self.credentials()?;

        let body = body.map(Value::to_string).unwrap_or_default();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = hmac_sha256_hex(
            credentials.secret_key().as_bytes(),
            prehash(&timestamp, &method, endpoint, &body).as_bytes(),
        )?;

        let url = format!("{}{}", self.base_url(credentials), endpoint);
        debug!(exchange = "coinbase", %method, endpoint, "API 요청");

        let mut builder = self
            .http
            .request(method, &url)
            .header("CB-ACCESS-KEY", credentials.api_key())
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", credentials.passphrase().unwrap_or_default())
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            builder = builder.body(body);
        }

        self.http.send_json(builder).await
    }

    fn product_query(endpoint: &str, symbol: Option<&str>) -> GatewayResult<String> {
        match symbol {
            None => Ok(endpoint.to_string()),
            Some(symbol) => {
                let query = serde_urlencoded::to_string([("product_id", symbol)]).map_err(|e| {
                    GatewayError::validation(format!("Coinbase 파라미터 인코딩 실패: {}", e))
                })?;
                Ok(format!("{}?{}", endpoint, query))
            }
        }
    }
}

// ============================================================================
// ExchangeAdapter 구현
// ============================================================================

#[async_trait]
impl ExchangeAdapter for CoinbaseClient {
    fn exchange(&self) -> ExchangeKind {
        EXCHANGE
    }

    fn set_credentials(&mut self, credentials: ExchangeCredentials) -> GatewayResult<()> {
        if self.credentials.is_some() {
            return Err(GatewayError::validation("Coinbase 자격 증명이 이미 설정되어 있습니다"));
        }
        credentials.validate_for(EXCHANGE)?;
        self.credentials = Some(credentials);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn omits_zero_balances(&self) -> bool {
        false
    }

    async fn get_balances(&self) -> GatewayResult<Vec<Balance>> {
        let response: CoinbaseAccounts = self.request(Method::GET, "/accounts", None).await?;

        response
            .accounts
            .into_iter()
            .map(|a| {
                Ok(Balance::new(
                    a.currency,
                    decimal(EXCHANGE, &a.available_balance.value)?,
                    decimal(EXCHANGE, &a.hold.value)?,
                ))
            })
            .collect()
    }

    async fn get_ticker(&self, symbol: &str) -> GatewayResult<Ticker> {
        let t: CoinbaseTicker = self
            .request(Method::GET, &format!("/products/{}/ticker", symbol), None)
            .await?;

        let or_zero = |raw: Option<&str>| -> GatewayResult<Decimal> {
            Ok(opt_decimal(EXCHANGE, raw)?.unwrap_or(Decimal::ZERO))
        };

        Ok(Ticker {
            symbol: symbol.to_string(),
            price: decimal(EXCHANGE, &t.price)?,
            change_24h: or_zero(t.change.as_deref())?,
            volume_24h: or_zero(t.volume.as_deref())?,
            high_24h: or_zero(t.high.as_deref())?,
            low_24h: or_zero(t.low.as_deref())?,
            timestamp: now_millis(),
        })
    }

    async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<usize>,
    ) -> GatewayResult<OrderBookSnapshot> {
        let book: CoinbaseBook = self
            .request(Method::GET, &format!("/products/{}/book", symbol), None)
            .await?;

        let levels = |entries: Vec<CoinbaseBookEntry>| -> GatewayResult<Vec<PriceLevel>> {
            entries
                .into_iter()
                .map(|e| {
                    Ok(PriceLevel::new(
                        decimal(EXCHANGE, &e.price)?,
                        decimal(EXCHANGE, &e.size)?,
                    ))
                })
                .collect()
        };

        Ok(OrderBookSnapshot {
            bids: levels(book.bids)?,
            asks: levels(book.asks)?,
            timestamp: now_millis(),
        }
        .truncated(depth))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        let payload = order_payload(request);

        info!(
            exchange = "coinbase",
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            amount = %request.amount,
            "주문 제출"
        );

        let response: CoinbaseCreateResponse =
            self.request(Method::POST, "/orders", Some(&payload)).await?;

        if response.success == Some(false) {
            let message = response
                .error_response
                .map(|v| v.to_string())
                .unwrap_or_else(|| "주문이 거부되었습니다".to_string());
            return Err(GatewayError::upstream(
                EXCHANGE.as_str(),
                UpstreamError::Api {
                    status: None,
                    message,
                },
            ));
        }

        let id = response
            .order_id
            .or(response.success_response.map(|r| r.order_id))
            .ok_or_else(|| {
                GatewayError::upstream(
                    EXCHANGE.as_str(),
                    UpstreamError::Parse("주문 응답에 order_id가 없습니다".to_string()),
                )
            })?;

        // 생성 응답에는 상태가 없으므로 open
        Ok(Order {
            id,
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            side: request.side,
            amount: request.amount,
            price: request.price,
            status: OrderStatus::Open,
            timestamp: now_millis(),
        })
    }

    async fn cancel_order(&self, order_id: &str, _symbol: Option<&str>) -> GatewayResult<bool> {
        self.credentials()?;

        match self
            .request::<Value>(Method::DELETE, &format!("/orders/{}", order_id), None)
            .await
        {
            Ok(_) => {
                info!(exchange = "coinbase", order_id, "주문 취소 완료");
                Ok(true)
            }
            Err(e) => {
                warn!(exchange = "coinbase", order_id, error = %e, "주문 취소 실패");
                Ok(false)
            }
        }
    }

    async fn get_order(&self, order_id: &str, _symbol: Option<&str>) -> GatewayResult<Order> {
        let response: CoinbaseOrderEnvelope = self
            .request(
                Method::GET,
                &format!("/orders/historical/{}", order_id),
                None,
            )
            .await?;
        response.order.into_order()
    }

    async fn get_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>> {
        let endpoint = Self::product_query("/orders/historical", symbol)?;
        let response: CoinbaseOrders = self.request(Method::GET, &endpoint, None).await?;
        response
            .orders
            .into_iter()
            .map(CoinbaseOrder::into_order)
            .collect()
    }

    async fn get_trades(&self, symbol: Option<&str>, limit: usize) -> GatewayResult<Vec<Trade>> {
        let endpoint = Self::product_query("/orders/historical/fills", symbol)?;
        let response: CoinbaseFills = self.request(Method::GET, &endpoint, None).await?;

        response
            .fills
            .into_iter()
            .take(limit)
            .map(|f| {
                Ok(Trade {
                    id: f.trade_id,
                    symbol: f.product_id,
                    side: side(EXCHANGE, &f.side)?,
                    amount: decimal(EXCHANGE, &f.size)?,
                    price: decimal(EXCHANGE, &f.price)?,
                    fee: decimal(EXCHANGE, &f.commission)?,
                    timestamp: rfc3339_millis(&f.trade_time),
                })
            })
            .collect()
    }
}
