//! 거래소 어댑터 추상화.
//!
//! 거래소마다 다른 서명 방식, 파라미터 인코딩, 응답 형식을 감추고
//! 정규 타입만 주고받는 거래소 중립적인 인터페이스를 제공합니다.

use async_trait::async_trait;

use super::{
    Balance, ExchangeCredentials, ExchangeKind, Order, OrderBookSnapshot, OrderRequest, Ticker,
    Trade, TradingPair,
};
use crate::error::{GatewayError, GatewayResult};

// =============================================================================
// ExchangeAdapter Trait
// =============================================================================

/// 거래소 어댑터 trait.
///
/// 하나의 인스턴스는 하나의 거래소와 하나의 자격 증명에 묶입니다.
/// `set_credentials` 이전에 호출된 모든 메서드는 `GatewayError::NotConfigured`를 반환합니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct BinanceClient {
///     http: HttpTransport,
///     credentials: Option<ExchangeCredentials>,
/// }
///
/// #[async_trait]
/// impl ExchangeAdapter for BinanceClient {
///     async fn get_balances(&self) -> GatewayResult<Vec<Balance>> {
///         // Binance API 호출 및 변환
///     }
///
///     // ... 나머지 메서드 구현
/// }
/// ```
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// 거래소 식별자.
    fn exchange(&self) -> ExchangeKind;

    /// 자격 증명 바인딩.
    ///
    /// 필수 필드가 없으면 `Validation`, 이미 바인딩된 경우에도 `Validation`을 반환합니다.
    fn set_credentials(&mut self, credentials: ExchangeCredentials) -> GatewayResult<()>;

    /// 자격 증명 바인딩 여부.
    fn is_configured(&self) -> bool;

    /// 잔고가 0인 자산을 `get_balances` 결과에서 제외하는지 여부.
    fn omits_zero_balances(&self) -> bool;

    /// 계좌 잔고 조회.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: 자격 증명 미설정
    /// - `Upstream`: 네트워크/인증/API 에러
    async fn get_balances(&self) -> GatewayResult<Vec<Balance>>;

    /// 24시간 시세 조회.
    async fn get_ticker(&self, symbol: &str) -> GatewayResult<Ticker>;

    /// 호가창 조회. `depth`가 있으면 각 방향 최대 `depth` 단계까지 반환합니다.
    async fn get_order_book(&self, symbol: &str, depth: Option<usize>)
        -> GatewayResult<OrderBookSnapshot>;

    /// 주문 생성.
    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order>;

    /// 주문 취소.
    ///
    /// 취소는 best-effort입니다. 거래소 호출이 실패하면 에러 대신 `Ok(false)`를 반환합니다.
    /// 자격 증명 미설정은 여전히 `NotConfigured` 에러입니다.
    async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> GatewayResult<bool>;

    /// 단일 주문 조회.
    async fn get_order(&self, order_id: &str, symbol: Option<&str>) -> GatewayResult<Order>;

    /// 주문 목록 조회.
    async fn get_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>>;

    /// 체결 내역 조회.
    async fn get_trades(&self, symbol: Option<&str>, limit: usize) -> GatewayResult<Vec<Trade>>;

    /// 거래 가능한 심볼 목록.
    ///
    /// 기본 구현은 `Validation`을 반환합니다. 심볼 목록 API를 지원하는 어댑터만 재정의합니다.
    async fn get_trading_pairs(&self) -> GatewayResult<Vec<TradingPair>> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured {
                exchange: self.exchange().to_string(),
            });
        }
        Err(GatewayError::validation(format!(
            "{}는 거래쌍 조회를 지원하지 않습니다",
            self.exchange()
        )))
    }
}

// =============================================================================
// AdapterFactory Trait
// =============================================================================

/// 거래소 이름으로 (자격 증명이 없는) 어댑터를 생성하는 팩토리.
///
/// 런타임 리플렉션 대신 `ExchangeKind` → 생성자 매핑으로 어댑터를 선택합니다.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, exchange: ExchangeKind) -> GatewayResult<Box<dyn ExchangeAdapter>>;
}
