//! Binance Spot REST 어댑터.
//!
//! # 서명 방식
//!
//! 서명이 필요한 요청은 URL 인코딩된 파라미터에 `timestamp`(밀리초)를 추가한 뒤
//! `HMAC-SHA256(secret, query)`의 hex 값을 `signature` 파라미터로 덧붙입니다.
//! API 키는 `X-MBX-APIKEY` 헤더로 전송합니다.
//!
//! # 잔고
//!
//! 가용/동결 금액이 모두 0인 자산은 결과에서 제외합니다.

use async_trait::async_trait;
use gateway_core::{
    now_millis, Balance, ExchangeAdapter, ExchangeCredentials, ExchangeKind, GatewayError,
    GatewayResult, Order, OrderBookSnapshot, OrderRequest, OrderSide, OrderStatus, OrderType,
    Ticker, Trade, TradingPair, UpstreamError,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    http::{AdapterOptions, HttpTransport},
    parse::{decimal, opt_decimal, price_levels, side},
    sign::hmac_sha256_hex,
};

const EXCHANGE: ExchangeKind = ExchangeKind::Binance;
const BASE_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";
const DEFAULT_DEPTH: usize = 100;
const MAX_TRADES_LIMIT: usize = 1000;

/// 인증 실패를 뜻하는 Binance 에러 코드.
const AUTH_ERROR_CODES: &[i64] = &[-1022, -2014, -2015];

/// Binance 주문 상태 → 정규 상태.
pub const ORDER_STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("NEW", OrderStatus::Open),
    ("PARTIALLY_FILLED", OrderStatus::Partial),
    ("FILLED", OrderStatus::Filled),
    ("CANCELED", OrderStatus::Cancelled),
    ("REJECTED", OrderStatus::Cancelled),
    ("EXPIRED", OrderStatus::Cancelled),
    ("EXPIRED_IN_MATCH", OrderStatus::Cancelled),
];

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct BinanceAccount {
    balances: Vec<BinanceBalance>,
}

#[derive(Debug, Deserialize)]
struct BinanceBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbol {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<BinanceSymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbolFilter {
    filter_type: String,
    min_qty: Option<String>,
    max_qty: Option<String>,
    step_size: Option<String>,
}

impl BinanceSymbol {
    /// `LOT_SIZE` 필터의 수량 제한을 포함해 변환.
    fn into_pair(self) -> GatewayResult<TradingPair> {
        let lot = self.filters.iter().find(|f| f.filter_type == "LOT_SIZE");
        let qty = |value: Option<&String>| opt_decimal(EXCHANGE, value.map(String::as_str));
        Ok(TradingPair {
            min_qty: qty(lot.and_then(|f| f.min_qty.as_ref()))?,
            max_qty: qty(lot.and_then(|f| f.max_qty.as_ref()))?,
            step_size: qty(lot.and_then(|f| f.step_size.as_ref()))?,
            symbol: self.symbol,
            base_asset: self.base_asset,
            quote_asset: self.quote_asset,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker24h {
    last_price: String,
    price_change_percent: String,
    volume: String,
    high_price: String,
    low_price: String,
    close_time: i64,
}

#[derive(Debug, Deserialize)]
struct BinanceDepth {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BinanceOrder {
    symbol: String,
    order_id: u64,
    orig_qty: String,
    #[serde(default)]
    price: Option<String>,
    status: String,
    #[serde(rename = "type")]
    order_type: String,
    side: String,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    transact_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTrade {
    symbol: String,
    id: u64,
    price: String,
    qty: String,
    commission: String,
    time: i64,
    is_buyer: bool,
}

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

impl BinanceOrder {
    /// 정규 주문으로 변환.
    pub(crate) fn into_order(self) -> GatewayResult<Order> {
        let order_type = OrderType::parse(&self.order_type);
        let price = match self.price.as_deref() {
            Some(raw) => {
                let price = decimal(EXCHANGE, raw)?;
                (!price.is_zero()).then_some(price)
            }
            None => None,
        };

        Ok(Order {
            id: self.order_id.to_string(),
            symbol: self.symbol,
            order_type,
            side: side(EXCHANGE, &self.side)?,
            amount: decimal(EXCHANGE, &self.orig_qty)?,
            price,
            status: OrderStatus::from_table(ORDER_STATUS_TABLE, &self.status),
            timestamp: self.transact_time.or(self.time).unwrap_or_else(now_millis),
        })
    }
}

/// 쿼리 문자열 서명.
pub(crate) fn sign_query(secret: &str, query: &str) -> GatewayResult<String> {
    hmac_sha256_hex(secret.as_bytes(), query.as_bytes())
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

pub struct BinanceClient {
    http: HttpTransport,
    base_url_override: Option<String>,
    credentials: Option<ExchangeCredentials>,
}

impl BinanceClient {
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
            None if credentials.sandbox() => TESTNET_URL,
            None => BASE_URL,
        }
    }

    fn encode(&self, params: &[(&str, String)]) -> GatewayResult<String> {
        serde_urlencoded::to_string(params)
            .map_err(|e| GatewayError::validation(format!("Binance 파라미터 인코딩 실패: {}", e)))
    }

    /// 공개 API 호출 (서명 없음).
    async fn public_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let credentials = self.credentials()?;
        let mut url = format!("{}{}", self.base_url(credentials), endpoint);
        if !params.is_empty() {
            url = format!("{}?{}", url, self.encode(params)?);
        }

        debug!(exchange = "binance", endpoint, "공개 API 요청");
        let builder = self.http.request(Method::GET, &url);
        self.http.send_json(builder).await.map_err(classify_error)
    }

    /// 서명 API 호출.
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let credentials = self.credentials()?;

        params.push(("timestamp", now_millis().to_string()));
        let query = self.encode(&params)?;
        let signature = sign_query(credentials.secret_key(), &query)?;
        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url(credentials),
            endpoint,
            query,
            signature
        );

        debug!(exchange = "binance", %method, endpoint, "서명 API 요청");
        let builder = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", credentials.api_key());
        self.http.send_json(builder).await.map_err(classify_error)
    }
}

/// Binance 에러 코드 중 인증 실패를 `Unauthorized`로 재분류.
fn classify_error(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::Upstream {
            exchange,
            source: UpstreamError::Api { status, message },
        } => {
            let source = match serde_json::from_str::<BinanceErrorBody>(&message) {
                Ok(body) if AUTH_ERROR_CODES.contains(&body.code) => {
                    UpstreamError::Unauthorized(format!("{}: {}", body.code, body.msg))
                }
                _ => UpstreamError::Api { status, message },
            };
            GatewayError::Upstream { exchange, source }
        }
        other => other,
    }
}

// ============================================================================
// ExchangeAdapter 구현
// ============================================================================

#[async_trait]
impl ExchangeAdapter for BinanceClient {
    fn exchange(&self) -> ExchangeKind {
        EXCHANGE
    }

    fn set_credentials(&mut self, credentials: ExchangeCredentials) -> GatewayResult<()> {
        if self.credentials.is_some() {
            return Err(GatewayError::validation("Binance 자격 증명이 이미 설정되어 있습니다"));
        }
        credentials.validate_for(EXCHANGE)?;
        self.credentials = Some(credentials);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn omits_zero_balances(&self) -> bool {
        true
    }

    async fn get_balances(&self) -> GatewayResult<Vec<Balance>> {
        let account: BinanceAccount = self.signed(Method::GET, "/api/v3/account", vec![]).await?;

        let mut balances = Vec::new();
        for b in account.balances {
            let free = decimal(EXCHANGE, &b.free)?;
            let locked = decimal(EXCHANGE, &b.locked)?;
            if free > Decimal::ZERO || locked > Decimal::ZERO {
                balances.push(Balance::new(b.asset, free, locked));
            }
        }
        Ok(balances)
    }

    async fn get_ticker(&self, symbol: &str) -> GatewayResult<Ticker> {
        let t: BinanceTicker24h = self
            .public_get("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;

        Ok(Ticker {
            symbol: symbol.to_string(),
            price: decimal(EXCHANGE, &t.last_price)?,
            change_24h: decimal(EXCHANGE, &t.price_change_percent)?,
            volume_24h: decimal(EXCHANGE, &t.volume)?,
            high_24h: decimal(EXCHANGE, &t.high_price)?,
            low_24h: decimal(EXCHANGE, &t.low_price)?,
            timestamp: t.close_time,
        })
    }

    async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<usize>,
    ) -> GatewayResult<OrderBookSnapshot> {
        let limit = depth.unwrap_or(DEFAULT_DEPTH);
        let book: BinanceDepth = self
            .public_get(
                "/api/v3/depth",
                &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(OrderBookSnapshot {
            bids: price_levels(EXCHANGE, &book.bids)?,
            asks: price_levels(EXCHANGE, &book.asks)?,
            timestamp: now_millis(),
        }
        .truncated(depth))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_str().to_uppercase()),
            ("type", request.order_type.as_str().to_uppercase()),
            ("quantity", request.amount.to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];
        if request.order_type == OrderType::Limit {
            let price = request
                .price
                .ok_or_else(|| GatewayError::validation("지정가 주문에는 가격이 필요합니다"))?;
            params.push(("timeInForce", "GTC".to_string()));
            params.push(("price", price.to_string()));
        }

        info!(
            exchange = "binance",
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            amount = %request.amount,
            "주문 제출"
        );

        let response: BinanceOrder = self.signed(Method::POST, "/api/v3/order", params).await?;
        let mut order = response.into_order()?;
        if order.price.is_none() {
            order.price = request.price;
        }
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> GatewayResult<bool> {
        self.credentials()?;
        let Some(symbol) = symbol else {
            warn!(exchange = "binance", order_id, "심볼 없이 주문 취소 불가");
            return Ok(false);
        };

        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        match self
            .signed::<Value>(Method::DELETE, "/api/v3/order", params)
            .await
        {
            Ok(_) => {
                info!(exchange = "binance", order_id, symbol, "주문 취소 완료");
                Ok(true)
            }
            Err(e) => {
                warn!(exchange = "binance", order_id, error = %e, "주문 취소 실패");
                Ok(false)
            }
        }
    }

    async fn get_order(&self, order_id: &str, symbol: Option<&str>) -> GatewayResult<Order> {
        self.credentials()?;
        let symbol = symbol
            .ok_or_else(|| GatewayError::validation("Binance 주문 조회에는 심볼이 필요합니다"))?;

        let order: BinanceOrder = self
            .signed(
                Method::GET,
                "/api/v3/order",
                vec![
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        order.into_order()
    }

    async fn get_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>> {
        // 심볼이 없으면 미체결 주문 전체, 있으면 해당 심볼의 전체 주문
        let orders: Vec<BinanceOrder> = match symbol {
            None => self.signed(Method::GET, "/api/v3/openOrders", vec![]).await?,
            Some(symbol) => {
                self.signed(
                    Method::GET,
                    "/api/v3/allOrders",
                    vec![("symbol", symbol.to_string())],
                )
                .await?
            }
        };
        orders.into_iter().map(BinanceOrder::into_order).collect()
    }

    async fn get_trading_pairs(&self) -> GatewayResult<Vec<TradingPair>> {
        let info: BinanceExchangeInfo = self.public_get("/api/v3/exchangeInfo", &[]).await?;
        info.symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(BinanceSymbol::into_pair)
            .collect()
    }

    async fn get_trades(&self, symbol: Option<&str>, limit: usize) -> GatewayResult<Vec<Trade>> {
        self.credentials()?;
        let symbol = symbol.ok_or_else(|| {
            GatewayError::validation("Binance 체결 내역 조회에는 심볼이 필요합니다")
        })?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let trades: Vec<BinanceTrade> = self
            .signed(
                Method::GET,
                "/api/v3/myTrades",
                vec![
                    ("symbol", symbol.to_string()),
                    ("limit", limit.min(MAX_TRADES_LIMIT).to_string()),
                ],
            )
            .await?;

        trades
            .into_iter()
            .map(|t| {
                Ok(Trade {
                    id: t.id.to_string(),
                    symbol: t.symbol,
                    side: if t.is_buyer {
                        OrderSide::Buy
                    } else {
                        OrderSide::Sell
                    },
                    amount: decimal(EXCHANGE, &t.qty)?,
                    price: decimal(EXCHANGE, &t.price)?,
                    fee: decimal(EXCHANGE, &t.commission)?,
                    timestamp: t.time,
                })
            })
            .collect()
    }
}
