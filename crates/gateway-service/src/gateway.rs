//! 거래소 게이트웨이 파사드.
//!
//! 모든 거래 요청은 다음 순서로 처리됩니다.
//!
//! ```text
//! 요청 → 인스턴스 조회 (NotFound) → 레이트 리밋 (RateLimitExceeded) → 어댑터 호출 (Upstream)
//! ```
//!
//! 거래소 호출 실패는 재시도하지 않고 그대로 반환합니다.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use gateway_core::{
    AdapterFactory, Balance, ExchangeAdapter, ExchangeCredentials, GatewayResult, Order,
    OrderBookSnapshot, OrderRequest, Ticker, Trade, TradingPair,
};
use gateway_exchange::{available_exchanges, AdapterOptions, DefaultAdapterFactory, ExchangeInfo};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    config::GatewayConfig,
    portfolio::{aggregate, InstanceBalance, PortfolioEntry},
    rate_limit::SlidingWindowRateLimiter,
    registry::{ExchangeRegistry, InstanceSummary},
};

/// 연결 테스트 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

/// 다중 사용자, 다중 거래소 게이트웨이.
pub struct ExchangeGateway {
    registry: ExchangeRegistry,
    limiter: SlidingWindowRateLimiter,
}

impl ExchangeGateway {
    pub fn new(registry: ExchangeRegistry, limiter: SlidingWindowRateLimiter) -> Self {
        Self { registry, limiter }
    }

    /// 설정으로 게이트웨이 구성 (메모리 저장소, 실제 거래소 커넥터).
    ///
    /// # Errors
    ///
    /// 암호화 키 형식이 잘못되면 `Configuration`.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let vault = config.build_vault()?;

        let options = AdapterOptions::default().with_timeout(config.request_timeout());
        let factory = config
            .base_urls
            .iter()
            .fold(DefaultAdapterFactory::new(options), |factory, (exchange, url)| {
                factory.with_base_url(*exchange, url.clone())
            });

        let limiter = SlidingWindowRateLimiter::from_config(&config.rate_limit);
        info!(
            max_requests = limiter.max_requests(),
            window_secs = limiter.window().as_secs(),
            timeout_secs = config.request_timeout_secs,
            "게이트웨이 구성 완료"
        );

        let factory: Arc<dyn AdapterFactory> = Arc::new(factory);
        Ok(Self::new(ExchangeRegistry::in_memory(vault, factory), limiter))
    }

    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    pub fn limiter(&self) -> &SlidingWindowRateLimiter {
        &self.limiter
    }

    /// 레이트 리미터 유휴 키 정리 태스크 시작.
    pub fn spawn_limiter_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.limiter.spawn_sweeper(interval)
    }

    /// 인스턴스 조회 후 레이트 리밋 적용.
    async fn acquire(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<Arc<dyn ExchangeAdapter>> {
        let adapter = self.registry.get_instance(user_id, instance_key).await?;
        self.limiter.check_and_record(user_id, instance_key)?;
        Ok(adapter)
    }

    // ========================================================================
    // 연결 관리
    // ========================================================================

    /// 지원 거래소 목록.
    pub fn available_exchanges(&self) -> Vec<ExchangeInfo> {
        available_exchanges()
    }

    pub async fn connect(
        &self,
        user_id: &str,
        exchange_name: &str,
        credentials: ExchangeCredentials,
        label: Option<&str>,
    ) -> GatewayResult<InstanceSummary> {
        self.registry
            .add_instance(user_id, exchange_name, credentials, label)
            .await
    }

    pub async fn disconnect(&self, user_id: &str, instance_key: &str) -> GatewayResult<bool> {
        self.registry.remove_instance(user_id, instance_key).await
    }

    pub async fn list_instances(&self, user_id: &str) -> GatewayResult<Vec<InstanceSummary>> {
        self.registry.list_instances(user_id).await
    }

    /// 잔고 조회로 연결 상태 확인.
    ///
    /// 인스턴스가 없으면 `NotFound`를 반환하고, 거래소 호출 실패는 `success = false`로 보고합니다.
    pub async fn test_connection(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<ConnectionTestResult> {
        let adapter = self.acquire(user_id, instance_key).await?;

        Ok(match adapter.get_balances().await {
            Ok(_) => ConnectionTestResult {
                success: true,
                message: "Connection successful".to_string(),
            },
            Err(e) => {
                warn!(user_id, instance_key, error = %e, "연결 테스트 실패");
                ConnectionTestResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        })
    }

    // ========================================================================
    // 잔고
    // ========================================================================

    pub async fn get_balances(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<Vec<Balance>> {
        self.acquire(user_id, instance_key)
            .await?
            .get_balances()
            .await
    }

    /// 모든 인스턴스 잔고를 동시에 조회.
    ///
    /// 실패한 인스턴스는 경고 로그를 남기고 결과에서 제외합니다.
    pub async fn get_all_balances(&self, user_id: &str) -> GatewayResult<Vec<InstanceBalance>> {
        let instances = self.registry.list_instances(user_id).await?;

        let results = join_all(instances.iter().map(|instance| async move {
            let balances = self.get_balances(user_id, &instance.instance_key).await;
            (instance, balances)
        }))
        .await;

        let mut all = Vec::new();
        for (instance, result) in results {
            match result {
                Ok(balances) => all.extend(balances.into_iter().map(|balance| InstanceBalance {
                    instance_key: instance.instance_key.clone(),
                    exchange: instance.exchange,
                    balance,
                })),
                Err(e) => warn!(
                    user_id,
                    instance_key = %instance.instance_key,
                    error = %e,
                    "잔고 조회 실패, 집계에서 제외"
                ),
            }
        }
        Ok(all)
    }

    /// 통화별 포트폴리오 합계.
    pub async fn get_portfolio_overview(&self, user_id: &str) -> GatewayResult<Vec<PortfolioEntry>> {
        let balances = self.get_all_balances(user_id).await?;
        Ok(aggregate(&balances))
    }

    // ========================================================================
    // 시세
    // ========================================================================

    pub async fn get_ticker(
        &self,
        user_id: &str,
        instance_key: &str,
        symbol: &str,
    ) -> GatewayResult<Ticker> {
        self.acquire(user_id, instance_key)
            .await?
            .get_ticker(symbol)
            .await
    }

    pub async fn get_order_book(
        &self,
        user_id: &str,
        instance_key: &str,
        symbol: &str,
        depth: Option<usize>,
    ) -> GatewayResult<OrderBookSnapshot> {
        self.acquire(user_id, instance_key)
            .await?
            .get_order_book(symbol, depth)
            .await
    }

    /// 거래 가능한 심볼 목록 (Binance, KuCoin).
    pub async fn get_trading_pairs(
        &self,
        user_id: &str,
        instance_key: &str,
    ) -> GatewayResult<Vec<TradingPair>> {
        self.acquire(user_id, instance_key)
            .await?
            .get_trading_pairs()
            .await
    }

    // ========================================================================
    // 주문
    // ========================================================================

    /// 주문 생성. 요청 검증은 인스턴스 조회와 레이트 리밋보다 먼저 수행합니다.
    pub async fn create_order(
        &self,
        user_id: &str,
        instance_key: &str,
        request: &OrderRequest,
    ) -> GatewayResult<Order> {
        request.validate()?;
        let adapter = self.acquire(user_id, instance_key).await?;
        let order = adapter.create_order(request).await?;
        info!(user_id, instance_key, order_id = %order.id, status = ?order.status, "주문 생성");
        Ok(order)
    }

    pub async fn cancel_order(
        &self,
        user_id: &str,
        instance_key: &str,
        order_id: &str,
        symbol: Option<&str>,
    ) -> GatewayResult<bool> {
        self.acquire(user_id, instance_key)
            .await?
            .cancel_order(order_id, symbol)
            .await
    }

    pub async fn get_order(
        &self,
        user_id: &str,
        instance_key: &str,
        order_id: &str,
        symbol: Option<&str>,
    ) -> GatewayResult<Order> {
        self.acquire(user_id, instance_key)
            .await?
            .get_order(order_id, symbol)
            .await
    }

    pub async fn get_orders(
        &self,
        user_id: &str,
        instance_key: &str,
        symbol: Option<&str>,
    ) -> GatewayResult<Vec<Order>> {
        self.acquire(user_id, instance_key)
            .await?
            .get_orders(symbol)
            .await
    }

    pub async fn get_trades(
        &self,
        user_id: &str,
        instance_key: &str,
        symbol: Option<&str>,
        limit: usize,
    ) -> GatewayResult<Vec<Trade>> {
        self.acquire(user_id, instance_key)
            .await?
            .get_trades(symbol, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use gateway_core::{CredentialVault, GatewayError, OrderSide};
    use gateway_exchange::{MockAdapterFactory, MockFailure, MockProfile};
    use rust_decimal_macros::dec;

    use super::*;

    fn gateway(factory: MockAdapterFactory, max_requests: usize) -> ExchangeGateway {
        let registry = ExchangeRegistry::in_memory(CredentialVault::generate(), Arc::new(factory));
        ExchangeGateway::new(
            registry,
            SlidingWindowRateLimiter::new(max_requests, Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn test_not_found_before_rate_limit() {
        let gw = gateway(MockAdapterFactory::new(), 1);
        assert!(matches!(
            gw.get_balances("u1", "binance").await,
            Err(GatewayError::NotFound { .. })
        ));
        assert_eq!(gw.limiter().tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_before_adapter() {
        let factory = MockAdapterFactory::new();
        let gw = gateway(factory.clone(), 2);
        gw.connect("u1", "binance", ExchangeCredentials::new("k", "s"), None)
            .await
            .unwrap();

        gw.get_balances("u1", "binance").await.unwrap();
        gw.get_ticker("u1", "binance", "BTCUSDT").await.unwrap();
        assert!(matches!(
            gw.get_orders("u1", "binance", None).await,
            Err(GatewayError::RateLimitExceeded { .. })
        ));
        assert_eq!(factory.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_order_rejected_without_upstream_call() {
        let factory = MockAdapterFactory::new();
        let gw = gateway(factory.clone(), 10);
        gw.connect("u1", "binance", ExchangeCredentials::new("k", "s"), None)
            .await
            .unwrap();

        let mut request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(1));
        request.amount = dec!(0);
        assert!(matches!(
            gw.create_order("u1", "binance", &request).await,
            Err(GatewayError::Validation(_))
        ));
        assert_eq!(factory.call_count(), 0);
        assert_eq!(gw.limiter().remaining("u1", "binance"), 10);
    }

    #[tokio::test]
    async fn test_connection_reports_failure_as_result() {
        let factory = MockAdapterFactory::new()
            .with_profile("bad", MockProfile::default().failing(MockFailure::Unauthorized));
        let gw = gateway(factory, 10);
        gw.connect("u1", "kraken", ExchangeCredentials::new("bad", "s"), None)
            .await
            .unwrap();

        let result = gw.test_connection("u1", "kraken").await.unwrap();
        assert!(!result.success);
        assert!(!result.message.is_empty());

        assert!(matches!(
            gw.test_connection("u1", "binance").await,
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_trading_pairs_unsupported_by_adapter() {
        let gw = gateway(MockAdapterFactory::new(), 10);
        gw.connect("u1", "kraken", ExchangeCredentials::new("k", "s"), None)
            .await
            .unwrap();
        assert!(matches!(
            gw.get_trading_pairs("u1", "kraken").await,
            Err(GatewayError::Validation(_))
        ));
        assert_eq!(gw.limiter().remaining("u1", "kraken"), 9);
    }

    #[tokio::test]
    async fn test_disconnect_then_not_found() {
        let gw = gateway(MockAdapterFactory::new(), 10);
        gw.connect("u1", "binance", ExchangeCredentials::new("k", "s"), Some("main"))
            .await
            .unwrap();
        assert!(gw.disconnect("u1", "binance_main").await.unwrap());
        assert!(matches!(
            gw.get_trades("u1", "binance_main", None, 10).await,
            Err(GatewayError::NotFound { .. })
        ));
    }
}
