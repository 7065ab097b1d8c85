//! Mock 거래소 어댑터.
//!
//! 네트워크 없이 레지스트리, 레이트 리미터, 게이트웨이 동작을 검증하기 위한 가상 거래소입니다.
//! 실제 커넥터와 동일한 [`ExchangeAdapter`] 인터페이스를 제공합니다.
//!
//! # 프로필
//!
//! 어댑터의 동작은 자격 증명의 API 키로 선택되는 [`MockProfile`]이 결정합니다.
//! 같은 거래소의 여러 인스턴스가 서로 다른 잔고나 실패 모드를 가질 수 있습니다.
//!
//! ```ignore
//! let factory = MockAdapterFactory::new()
//!     .with_profile("alice-key", MockProfile::default().with_balance("BTC", dec!(1.0)))
//!     .with_profile("broken-key", MockProfile::default().failing(MockFailure::Unauthorized));
//! ```

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use gateway_core::{
    now_millis, AdapterFactory, Balance, ExchangeAdapter, ExchangeCredentials, ExchangeKind,
    GatewayError, GatewayResult, Order, OrderBookSnapshot, OrderRequest, OrderStatus, PriceLevel,
    Ticker, Trade, UpstreamError,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

/// Mock 어댑터 실패 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unauthorized,
    Network,
    Timeout,
}

impl MockFailure {
    fn to_error(self, exchange: ExchangeKind) -> GatewayError {
        let source = match self {
            Self::Unauthorized => UpstreamError::Unauthorized("mock: invalid api key".to_string()),
            Self::Network => UpstreamError::Network("mock: connection refused".to_string()),
            Self::Timeout => UpstreamError::Timeout("mock: request timed out".to_string()),
        };
        GatewayError::upstream(exchange.as_str(), source)
    }
}

/// Mock 어댑터 동작 설정.
#[derive(Debug, Clone, Default)]
pub struct MockProfile {
    balances: Vec<Balance>,
    last_price: Decimal,
    failure: Option<MockFailure>,
}

impl MockProfile {
    /// 가용 잔고 추가 (빌더 패턴).
    pub fn with_balance(mut self, currency: impl Into<String>, available: Decimal) -> Self {
        self.balances.push(Balance::available_only(currency, available));
        self
    }

    /// 동결 잔고를 포함한 잔고 추가 (빌더 패턴).
    pub fn with_locked_balance(
        mut self,
        currency: impl Into<String>,
        available: Decimal,
        locked: Decimal,
    ) -> Self {
        self.balances.push(Balance::new(currency, available, locked));
        self
    }

    /// 시세 조회 시 반환할 가격 (빌더 패턴).
    pub fn with_last_price(mut self, price: Decimal) -> Self {
        self.last_price = price;
        self
    }

    /// 모든 거래소 호출을 실패시킴 (빌더 패턴).
    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

// ============================================================================
// MockAdapter
// ============================================================================

/// Mock 거래소 어댑터.
pub struct MockAdapter {
    exchange: ExchangeKind,
    profiles: Arc<HashMap<String, MockProfile>>,
    profile: MockProfile,
    credentials: Option<ExchangeCredentials>,
    orders: RwLock<Vec<Order>>,
    next_order_id: AtomicU64,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(exchange: ExchangeKind) -> Self {
        Self::with_profiles(exchange, Arc::new(HashMap::new()), Arc::new(AtomicUsize::new(0)))
    }

    fn with_profiles(
        exchange: ExchangeKind,
        profiles: Arc<HashMap<String, MockProfile>>,
        calls: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            exchange,
            profiles,
            profile: MockProfile::default(),
            credentials: None,
            orders: RwLock::new(Vec::new()),
            next_order_id: AtomicU64::new(1),
            calls,
        }
    }

    /// 거래소 호출 진입 처리: 자격 증명 확인, 호출 횟수 기록, 실패 모드 적용.
    fn enter(&self) -> GatewayResult<()> {
        if self.credentials.is_none() {
            return Err(GatewayError::NotConfigured {
                exchange: self.exchange.to_string(),
            });
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.profile.failure {
            Some(failure) => Err(failure.to_error(self.exchange)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockAdapter {
    fn exchange(&self) -> ExchangeKind {
        self.exchange
    }

    fn set_credentials(&mut self, credentials: ExchangeCredentials) -> GatewayResult<()> {
        if self.credentials.is_some() {
            return Err(GatewayError::validation("Mock 자격 증명이 이미 설정되어 있습니다"));
        }
        credentials.validate_for(self.exchange)?;
        self.profile = self
            .profiles
            .get(credentials.api_key())
            .cloned()
            .unwrap_or_default();
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
        self.enter()?;
        Ok(self.profile.balances.clone())
    }

    async fn get_ticker(&self, symbol: &str) -> GatewayResult<Ticker> {
        self.enter()?;
        let price = self.profile.last_price;
        Ok(Ticker {
            symbol: symbol.to_string(),
            price,
            change_24h: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            high_24h: price,
            low_24h: price,
            timestamp: now_millis(),
        })
    }

    async fn get_order_book(
        &self,
        _symbol: &str,
        depth: Option<usize>,
    ) -> GatewayResult<OrderBookSnapshot> {
        self.enter()?;
        let price = self.profile.last_price;
        Ok(OrderBookSnapshot {
            bids: vec![PriceLevel::new(price, Decimal::ONE)],
            asks: vec![PriceLevel::new(price, Decimal::ONE)],
            timestamp: now_millis(),
        }
        .truncated(depth))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        self.enter()?;
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            id: format!("mock-{}", id),
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            side: request.side,
            amount: request.amount,
            price: request.price,
            status: OrderStatus::Open,
            timestamp: now_millis(),
        };
        debug!(exchange = %self.exchange, order_id = %order.id, "Mock 주문 생성");
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, _symbol: Option<&str>) -> GatewayResult<bool> {
        match self.enter() {
            Err(GatewayError::Upstream { .. }) => return Ok(false),
            other => other?,
        }
        let mut orders = self.orders.write().await;
        match orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::Open)
        {
            Some(order) => {
                order.status = OrderStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_order(&self, order_id: &str, _symbol: Option<&str>) -> GatewayResult<Order> {
        self.enter()?;
        self.orders
            .read()
            .await
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| {
                GatewayError::upstream(
                    self.exchange.as_str(),
                    UpstreamError::Api {
                        status: Some(404),
                        message: format!("order not found: {}", order_id),
                    },
                )
            })
    }

    async fn get_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>> {
        self.enter()?;
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect())
    }

    async fn get_trades(&self, _symbol: Option<&str>, _limit: usize) -> GatewayResult<Vec<Trade>> {
        self.enter()?;
        Ok(Vec::new())
    }
}

// ============================================================================
// MockAdapterFactory
// ============================================================================

/// [`MockAdapter`] 팩토리.
///
/// 생성된 모든 어댑터의 거래소 호출 횟수를 공유 카운터로 집계합니다.
#[derive(Debug, Clone, Default)]
pub struct MockAdapterFactory {
    profiles: HashMap<String, MockProfile>,
    calls: Arc<AtomicUsize>,
}

impl MockAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// API 키별 동작 설정 (빌더 패턴).
    pub fn with_profile(mut self, api_key: impl Into<String>, profile: MockProfile) -> Self {
        self.profiles.insert(api_key.into(), profile);
        self
    }

    /// 지금까지 어댑터가 거래소 호출을 받은 횟수.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AdapterFactory for MockAdapterFactory {
    fn create(&self, exchange: ExchangeKind) -> GatewayResult<Box<dyn ExchangeAdapter>> {
        Ok(Box::new(MockAdapter::with_profiles(
            exchange,
            Arc::new(self.profiles.clone()),
            Arc::clone(&self.calls),
        )))
    }
}
