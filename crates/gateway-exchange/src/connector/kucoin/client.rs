//! KuCoin Spot REST 어댑터.
//!
//! # 서명 방식 (API Key Version 2)
//!
//! - `KC-API-SIGN = base64(HMAC-SHA256(secret, timestamp + METHOD + requestPath + body))`
//! - `KC-API-PASSPHRASE = base64(HMAC-SHA256(secret, passphrase))`
//! - requestPath에는 GET 쿼리 문자열이 포함됩니다.
//!
//! 응답 봉투의 `code`가 `"200000"`이 아니면 실패입니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gateway_core::{
    now_millis, Balance, ExchangeAdapter, ExchangeCredentials, ExchangeKind, GatewayError,
    GatewayResult, Order, OrderBookSnapshot, OrderRequest, OrderStatus, OrderType, Ticker, Trade,
    TradingPair, UpstreamError,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    http::{AdapterOptions, HttpTransport},
    parse::{decimal, opt_decimal, price_levels, side},
    sign::hmac_sha256_base64,
};

const EXCHANGE: ExchangeKind = ExchangeKind::Kucoin;
const BASE_URL: &str = "https://api.kucoin.com";
const SANDBOX_URL: &str = "https://openapi-sandbox.kucoin.com";
const SUCCESS_CODE: &str = "200000";
const SMALL_BOOK_DEPTH: usize = 20;
const MIN_TRADES_PAGE: usize = 10;
const MAX_TRADES_PAGE: usize = 500;

/// 인증 실패로 분류하는 KuCoin 에러 코드.
const AUTH_ERROR_CODES: &[&str] = &[
    "400001", "400002", "400003", "400004", "400005", "400006", "400007",
];

/// KuCoin 주문 상태 키워드 → 정규 상태.
///
/// 키워드는 `isActive`/`cancelExist` 플래그에서 도출합니다.
pub const ORDER_STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("active", OrderStatus::Open),
    ("done", OrderStatus::Filled),
    ("cancel", OrderStatus::Cancelled),
];

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct KucoinEnvelope<T> {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KucoinAccount {
    currency: String,
    #[serde(rename = "type")]
    account_type: String,
    available: String,
    holds: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinSymbol {
    symbol: String,
    base_currency: String,
    quote_currency: String,
    enable_trading: bool,
    base_min_size: Option<String>,
    base_max_size: Option<String>,
    base_increment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KucoinLevel1 {
    price: String,
    time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinStats {
    #[serde(default)]
    change_rate: Option<String>,
    #[serde(default)]
    vol: Option<String>,
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KucoinOrderBook {
    time: i64,
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinOrderId {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct KucoinPage<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KucoinOrder {
    id: String,
    symbol: String,
    #[serde(rename = "type")]
    order_type: String,
    side: String,
    size: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    deal_size: Option<String>,
    is_active: bool,
    #[serde(default)]
    cancel_exist: bool,
    created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinFill {
    trade_id: String,
    symbol: String,
    side: String,
    size: String,
    price: String,
    fee: String,
    created_at: i64,
}

impl KucoinOrder {
    fn state_keyword(&self) -> &'static str {
        if self.is_active {
            "active"
        } else if self.cancel_exist {
            "cancel"
        } else {
            "done"
        }
    }

    /// 정규 주문으로 변환.
    ///
    /// 활성 주문 중 체결 수량이 있으면 `partial`로 취급합니다.
    pub(crate) fn into_order(self) -> GatewayResult<Order> {
        let mut status = OrderStatus::from_table(ORDER_STATUS_TABLE, self.state_keyword());
        let dealt = opt_decimal(EXCHANGE, self.deal_size.as_deref())?.unwrap_or(Decimal::ZERO);
        if status == OrderStatus::Open && dealt > Decimal::ZERO {
            status = OrderStatus::Partial;
        }

        let price = opt_decimal(EXCHANGE, self.price.as_deref())?.filter(|p| !p.is_zero());

        Ok(Order {
            id: self.id,
            symbol: self.symbol,
            order_type: OrderType::parse(&self.order_type),
            side: side(EXCHANGE, &self.side)?,
            amount: decimal(EXCHANGE, &self.size)?,
            price,
            status,
            timestamp: self.created_at,
        })
    }
}

/// 서명 원문 생성.
pub(crate) fn prehash(timestamp: &str, method: &Method, request_path: &str, body: &str) -> String {
    format!(
        "{}{}{}{}",
        timestamp,
        method.as_str().to_uppercase(),
        request_path,
        body
    )
}

/// 요청 서명.
pub(crate) fn sign(secret: &str, message: &str) -> GatewayResult<String> {
    hmac_sha256_base64(secret.as_bytes(), message.as_bytes())
}

/// API Key Version 2 passphrase 서명.
pub(crate) fn sign_passphrase(secret: &str, passphrase: &str) -> GatewayResult<String> {
    hmac_sha256_base64(secret.as_bytes(), passphrase.as_bytes())
}

/// 잔고 응답 집계. `trade` 계좌만 합산하며, 다른 계좌 유형만 있는 통화는 0으로 남습니다.
fn aggregate_balances(accounts: Vec<KucoinAccount>) -> GatewayResult<Vec<Balance>> {
    let mut totals: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for account in accounts {
        let entry = totals
            .entry(account.currency)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        if account.account_type == "trade" {
            entry.0 += decimal(EXCHANGE, &account.available)?;
            entry.1 += decimal(EXCHANGE, &account.holds)?;
        }
    }
    Ok(totals
        .into_iter()
        .map(|(currency, (available, locked))| Balance::new(currency, available, locked))
        .collect())
}

// ============================================================================
// KuCoin 클라이언트
// ============================================================================

pub struct KucoinClient {
    http: HttpTransport,
    base_url_override: Option<String>,
    credentials: Option<ExchangeCredentials>,
}

impl KucoinClient {
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

    fn path_with_query(endpoint: &str, params: &[(&str, String)]) -> GatewayResult<String> {
        if params.is_empty() {
            return Ok(endpoint.to_string());
        }
        let query = serde_urlencoded::to_string(params)
            .map_err(|e| GatewayError::validation(format!("KuCoin 파라미터 인코딩 실패: {}", e)))?;
        Ok(format!("{}?{}", endpoint, query))
    }

    fn unwrap_envelope<T>(&self, envelope: KucoinEnvelope<T>) -> GatewayResult<T> {
        if envelope.code != SUCCESS_CODE {
            let message = format!(
                "{}: {}",
                envelope.code,
                envelope.msg.unwrap_or_else(|| "KuCoin API error".to_string())
            );
            let source = if AUTH_ERROR_CODES.contains(&envelope.code.as_str()) {
                UpstreamError::Unauthorized(message)
            } else {
                UpstreamError::Api {
                    status: None,
                    message,
                }
            };
            return Err(self.http.upstream(source));
        }
        envelope
            .data
            .ok_or_else(|| self.http.parse_error("KuCoin 응답에 data가 없습니다"))
    }

    /// 공개 API 호출.
    async fn public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<T> {
        let credentials = self.credentials()?;
        let path = Self::path_with_query(endpoint, params)?;
        let url = format!("{}{}", self.base_url(credentials), path);

        debug!(exchange = "kucoin", endpoint, "공개 API 요청");
        let builder = self.http.request(Method::GET, &url);
        let envelope: KucoinEnvelope<T> = self.http.send_json(builder).await?;
        self.unwrap_envelope(envelope)
    }

    /// 서명 API 호출.
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> GatewayResult<T> {
        let credentials = self.credentials()?;
        let request_path = Self::path_with_query(endpoint, params)?;
        let body = body.map(Value::to_string).unwrap_or_default();
        let timestamp = now_millis().to_string();

        let signature = sign(
            credentials.secret_key(),
            &prehash(&timestamp, &method, &request_path, &body),
        )?;
        let passphrase = sign_passphrase(
            credentials.secret_key(),
            credentials.passphrase().unwrap_or_default(),
        )?;

        let url = format!("{}{}", self.base_url(credentials), request_path);
        debug!(exchange = "kucoin", %method, endpoint, "서명 API 요청");

        let mut builder = self
            .http
            .request(method, &url)
            .header("KC-API-KEY", credentials.api_key())
            .header("KC-API-SIGN", signature)
            .header("KC-API-TIMESTAMP", timestamp)
            .header("KC-API-PASSPHRASE", passphrase)
            .header("KC-API-KEY-VERSION", "2")
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let envelope: KucoinEnvelope<T> = self.http.send_json(builder).await?;
        self.unwrap_envelope(envelope)
    }
}

// ============================================================================
// ExchangeAdapter 구현
// ============================================================================

#[async_trait]
impl ExchangeAdapter for KucoinClient {
    fn exchange(&self) -> ExchangeKind {
        EXCHANGE
    }

    fn set_credentials(&mut self, credentials: ExchangeCredentials) -> GatewayResult<()> {
        if self.credentials.is_some() {
            return Err(GatewayError::validation("KuCoin 자격 증명이 이미 설정되어 있습니다"));
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
        let accounts: Vec<KucoinAccount> = self
            .signed(Method::GET, "/api/v1/accounts", &[], None)
            .await?;
        aggregate_balances(accounts)
    }

    async fn get_ticker(&self, symbol: &str) -> GatewayResult<Ticker> {
        let params = [("symbol", symbol.to_string())];
        let level1: KucoinLevel1 = self
            .public("/api/v1/market/orderbook/level1", &params)
            .await?;
        let stats: KucoinStats = self.public("/api/v1/market/stats", &params).await?;

        let or_zero = |raw: Option<&str>| -> GatewayResult<Decimal> {
            Ok(opt_decimal(EXCHANGE, raw)?.unwrap_or(Decimal::ZERO))
        };

        Ok(Ticker {
            symbol: symbol.to_string(),
            price: decimal(EXCHANGE, &level1.price)?,
            change_24h: or_zero(stats.change_rate.as_deref())?,
            volume_24h: or_zero(stats.vol.as_deref())?,
            high_24h: or_zero(stats.high.as_deref())?,
            low_24h: or_zero(stats.low.as_deref())?,
            timestamp: level1.time,
        })
    }

    async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<usize>,
    ) -> GatewayResult<OrderBookSnapshot> {
        let endpoint = match depth {
            Some(d) if d <= SMALL_BOOK_DEPTH => "/api/v1/market/orderbook/level2_20",
            _ => "/api/v1/market/orderbook/level2_100",
        };
        let book: KucoinOrderBook = self
            .public(endpoint, &[("symbol", symbol.to_string())])
            .await?;

        Ok(OrderBookSnapshot {
            bids: price_levels(EXCHANGE, &book.bids)?,
            asks: price_levels(EXCHANGE, &book.asks)?,
            timestamp: book.time,
        }
        .truncated(depth))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        let mut body = json!({
            "clientOid": Uuid::new_v4().to_string(),
            "side": request.side.as_str(),
            "symbol": request.symbol,
            "type": request.order_type.as_str(),
            "size": request.amount.to_string(),
        });
        if let (OrderType::Limit, Some(price)) = (request.order_type, request.price) {
            body["price"] = json!(price.to_string());
        }

        info!(
            exchange = "kucoin",
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            amount = %request.amount,
            "주문 제출"
        );

        let result: KucoinOrderId = self
            .signed(Method::POST, "/api/v1/orders", &[], Some(&body))
            .await?;

        Ok(Order {
            id: result.order_id,
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
            .signed::<Value>(
                Method::DELETE,
                &format!("/api/v1/orders/{}", order_id),
                &[],
                None,
            )
            .await
        {
            Ok(_) => {
                info!(exchange = "kucoin", order_id, "주문 취소 완료");
                Ok(true)
            }
            Err(e) => {
                warn!(exchange = "kucoin", order_id, error = %e, "주문 취소 실패");
                Ok(false)
            }
        }
    }

    async fn get_order(&self, order_id: &str, _symbol: Option<&str>) -> GatewayResult<Order> {
        let order: KucoinOrder = self
            .signed(
                Method::GET,
                &format!("/api/v1/orders/{}", order_id),
                &[],
                None,
            )
            .await?;
        order.into_order()
    }

    async fn get_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>> {
        let mut params = vec![("status", "active".to_string())];
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol.to_string()));
        }

        let page: KucoinPage<KucoinOrder> = self
            .signed(Method::GET, "/api/v1/orders", &params, None)
            .await?;
        page.items.into_iter().map(KucoinOrder::into_order).collect()
    }

    async fn get_trading_pairs(&self) -> GatewayResult<Vec<TradingPair>> {
        let symbols: Vec<KucoinSymbol> = self.public("/api/v1/symbols", &[]).await?;
        symbols
            .into_iter()
            .filter(|s| s.enable_trading)
            .map(|s| {
                Ok(TradingPair {
                    min_qty: opt_decimal(EXCHANGE, s.base_min_size.as_deref())?,
                    max_qty: opt_decimal(EXCHANGE, s.base_max_size.as_deref())?,
                    step_size: opt_decimal(EXCHANGE, s.base_increment.as_deref())?,
                    symbol: s.symbol,
                    base_asset: s.base_currency,
                    quote_asset: s.quote_currency,
                })
            })
            .collect()
    }

    async fn get_trades(&self, symbol: Option<&str>, limit: usize) -> GatewayResult<Vec<Trade>> {
        self.credentials()?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        // pageSize는 10..=500 범위만 허용됨
        let page_size = limit.clamp(MIN_TRADES_PAGE, MAX_TRADES_PAGE);
        let mut params = vec![("pageSize", page_size.to_string())];
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol.to_string()));
        }

        let page: KucoinPage<KucoinFill> = self
            .signed(Method::GET, "/api/v1/fills", &params, None)
            .await?;

        page.items
            .into_iter()
            .take(limit)
            .map(|f| {
                Ok(Trade {
                    id: f.trade_id,
                    symbol: f.symbol,
                    side: side(EXCHANGE, &f.side)?,
                    amount: decimal(EXCHANGE, &f.size)?,
                    price: decimal(EXCHANGE, &f.price)?,
                    fee: decimal(EXCHANGE, &f.fee)?,
                    timestamp: f.created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    use super::*;

    fn client_for(server: &mockito::Server) -> KucoinClient {
        let mut client =
            KucoinClient::new(AdapterOptions::default().with_base_url(server.url())).unwrap();
        client
            .set_credentials(
                ExchangeCredentials::new("kc-key", "kc-secret").with_passphrase("kc-pass"),
            )
            .unwrap();
        client
    }

    #[test]
    fn test_prehash_includes_query() {
        let path = KucoinClient::path_with_query(
            "/api/v1/orders",
            &[("status", "active".to_string()), ("symbol", "BTC-USDT".to_string())],
        )
        .unwrap();
        assert_eq!(path, "/api/v1/orders?status=active&symbol=BTC-USDT");
        assert_eq!(
            prehash("1700000000000", &Method::GET, &path, ""),
            "1700000000000GET/api/v1/orders?status=active&symbol=BTC-USDT"
        );
    }

    #[test]
    fn test_signatures_are_base64_hmac() {
        let message = prehash("1700000000000", &Method::POST, "/api/v1/orders", r#"{"a":1}"#);
        assert_eq!(
            sign("kc-secret", &message).unwrap(),
            hmac_sha256_base64(b"kc-secret", b"1700000000000POST/api/v1/orders{\"a\":1}").unwrap()
        );
        // RFC 4231 Test Case 2 (base64)
        assert_eq!(
            sign_passphrase("Jefe", "what do ya want for nothing?").unwrap(),
            "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM="
        );
    }

    #[test]
    fn test_order_status_table() {
        let expected = [
            (true, false, "0", OrderStatus::Open),
            (true, false, "0.3", OrderStatus::Partial),
            (false, false, "1", OrderStatus::Filled),
            (false, true, "0", OrderStatus::Cancelled),
        ];
        for (is_active, cancel_exist, deal_size, status) in expected {
            let order: KucoinOrder = serde_json::from_value(json!({
                "id": "5c35c02703aa673ceec2a168",
                "symbol": "BTC-USDT",
                "type": "limit",
                "side": "buy",
                "size": "1",
                "price": "10",
                "dealSize": deal_size,
                "isActive": is_active,
                "cancelExist": cancel_exist,
                "createdAt": 1547026471000i64
            }))
            .unwrap();
            assert_eq!(order.into_order().unwrap().status, status);
        }
    }

    #[test]
    fn test_aggregate_balances_sums_trade_accounts() {
        let accounts: Vec<KucoinAccount> = serde_json::from_value(json!([
            {"currency": "BTC", "type": "trade", "available": "0.5", "holds": "0.1", "balance": "0.6"},
            {"currency": "BTC", "type": "trade", "available": "0.25", "holds": "0", "balance": "0.25"},
            {"currency": "BTC", "type": "main", "available": "9", "holds": "0", "balance": "9"},
            {"currency": "ETH", "type": "main", "available": "3", "holds": "0", "balance": "3"}
        ]))
        .unwrap();

        let balances = aggregate_balances(accounts).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].currency(), "BTC");
        assert_eq!(balances[0].available(), dec!(0.75));
        assert_eq!(balances[0].locked(), dec!(0.1));
        assert_eq!(balances[1].currency(), "ETH");
        assert!(balances[1].is_zero());
    }

    #[tokio::test]
    async fn test_requires_credentials() {
        let client = KucoinClient::new(AdapterOptions::default()).unwrap();
        assert!(matches!(
            client.get_order_book("BTC-USDT", None).await,
            Err(GatewayError::NotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_balances_sends_signed_headers() {
        let mut server = mockito::Server::new_async().await;
        let expected_passphrase = sign_passphrase("kc-secret", "kc-pass").unwrap();
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .match_header("KC-API-KEY", "kc-key")
            .match_header("KC-API-KEY-VERSION", "2")
            .match_header("KC-API-PASSPHRASE", expected_passphrase.as_str())
            .match_header("KC-API-SIGN", Matcher::Any)
            .match_header("KC-API-TIMESTAMP", Matcher::Regex(r"^\d{13}$".to_string()))
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":[
                    {"id":"1","currency":"USDT","type":"trade","balance":"10","available":"10","holds":"0"}
                ]}"#,
            )
            .create_async()
            .await;

        let balances = client_for(&server).get_balances().await.unwrap();
        mock.assert_async().await;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].total(), dec!(10));
    }

    #[tokio::test]
    async fn test_envelope_error_codes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts")
            .with_status(200)
            .with_body(r#"{"code":"400005","msg":"Invalid KC-API-SIGN"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/orders")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"300000","msg":"Order does not exist"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_balances().await.unwrap_err();
        assert!(err.is_auth_failure(), "unexpected error: {:?}", err);

        let err = client.get_orders(None).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream {
                source: UpstreamError::Api { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_small_depth_uses_level2_20() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/market/orderbook/level2_20")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTC-USDT".into()))
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":{"sequence":"1","time":1700000000000,
                    "bids":[["30000","1"],["29999","2"],["29998","3"]],
                    "asks":[["30001","1"]]}}"#,
            )
            .create_async()
            .await;

        let book = client_for(&server)
            .get_order_book("BTC-USDT", Some(2))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.timestamp, 1700000000000);
    }

    #[tokio::test]
    async fn test_get_ticker_combines_level1_and_stats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"sequence":"1","price":"30500.5","size":"0.1","time":1700000000123}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/market/stats")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"symbol":"BTC-USDT","changeRate":"0.0123","vol":"1500.5","high":"31000","low":"29000"}}"#)
            .create_async()
            .await;

        let ticker = client_for(&server).get_ticker("BTC-USDT").await.unwrap();
        assert_eq!(ticker.price, dec!(30500.5));
        assert_eq!(ticker.change_24h, dec!(0.0123));
        assert_eq!(ticker.high_24h, dec!(31000));
        assert_eq!(ticker.timestamp, 1700000000123);
    }

    #[tokio::test]
    async fn test_create_order_sends_client_oid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/orders")
            .match_body(Matcher::Regex(r#""clientOid":"[0-9a-f-]{36}""#.to_string()))
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"orderId":"5bd6e9286d99522a52e458de"}}"#)
            .create_async()
            .await;

        let request = OrderRequest::limit("BTC-USDT", gateway_core::OrderSide::Buy, dec!(1), dec!(10));
        let order = client_for(&server).create_order(&request).await.unwrap();
        mock.assert_async().await;
        assert_eq!(order.id, "5bd6e9286d99522a52e458de");
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_cancel_is_best_effort() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/orders/nope")
            .with_status(400)
            .with_body(r#"{"code":"400100","msg":"order not exist"}"#)
            .create_async()
            .await;

        assert!(!client_for(&server).cancel_order("nope", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_trading_pairs_skip_disabled_symbols() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/symbols")
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":[
                    {"symbol":"BTC-USDT","baseCurrency":"BTC","quoteCurrency":"USDT","enableTrading":true,
                     "baseMinSize":"0.00001","baseMaxSize":"10000000000","baseIncrement":"0.00000001"},
                    {"symbol":"OLD-USDT","baseCurrency":"OLD","quoteCurrency":"USDT","enableTrading":false}
                ]}"#,
            )
            .create_async()
            .await;

        let pairs = client_for(&server).get_trading_pairs().await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].quote_asset, "USDT");
        assert_eq!(pairs[0].min_qty, Some(dec!(0.00001)));
        assert_eq!(pairs[0].step_size, Some(dec!(0.00000001)));
    }

    #[tokio::test]
    async fn test_get_trades_truncates_to_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/fills")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageSize".into(), "10".into()),
                Matcher::UrlEncoded("symbol".into(), "BTC-USDT".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":{"items":[
                    {"tradeId":"t3","symbol":"BTC-USDT","side":"buy","size":"0.1","price":"50000","fee":"0.5","createdAt":1700000003000},
                    {"tradeId":"t2","symbol":"BTC-USDT","side":"sell","size":"0.2","price":"49000","fee":"0.4","createdAt":1700000002000},
                    {"tradeId":"t1","symbol":"BTC-USDT","side":"buy","size":"0.3","price":"48000","fee":"0.3","createdAt":1700000001000}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let trades = client.get_trades(Some("BTC-USDT"), 1).await.unwrap();
        mock.assert_async().await;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, "t3");
        assert_eq!(trades[0].side, gateway_core::OrderSide::Buy);

        // 0건 요청은 거래소를 호출하지 않음
        assert!(client.get_trades(Some("BTC-USDT"), 0).await.unwrap().is_empty());
        mock.assert_async().await;
    }
}
