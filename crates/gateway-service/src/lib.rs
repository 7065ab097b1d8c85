//! 다중 사용자 거래소 게이트웨이 서비스 계층.
//!
//! - [`config`]: 환경변수 기반 설정
//! - [`rate_limit`]: `(user_id, instance_key)`별 슬라이딩 윈도우 레이트 리미터
//! - [`registry`]: 사용자별 거래소 인스턴스 레지스트리 (암호화 저장, 어댑터 재구성)
//! - [`portfolio`]: 통화별 잔고 집계
//! - [`gateway`]: 위 구성 요소를 묶는 [`ExchangeGateway`] 파사드

pub mod config;
pub mod gateway;
pub mod portfolio;
pub mod rate_limit;
pub mod registry;

pub use config::{GatewayConfig, RateLimitConfig};
pub use gateway::{ConnectionTestResult, ExchangeGateway};
pub use portfolio::{aggregate, ExchangeContribution, InstanceBalance, PortfolioEntry};
pub use rate_limit::SlidingWindowRateLimiter;
pub use registry::{
    instance_key, ExchangeRegistry, InMemoryInstanceStore, InstanceRecord, InstanceStore,
    InstanceSummary,
};
