//! 거래소 게이트웨이 핵심 타입.
//!
//! - [`domain`]: 정규 거래 타입, [`ExchangeAdapter`], [`AdapterFactory`]
//! - [`error`]: [`GatewayError`] 에러 분류
//! - [`vault`]: 자격 증명 암호화 [`CredentialVault`]

pub mod domain;
pub mod error;
pub mod vault;

pub use domain::{
    now_millis, AdapterFactory, Balance, ExchangeAdapter, ExchangeCredentials, ExchangeKind,
    Order, OrderBookSnapshot, OrderRequest, OrderSide, OrderStatus, OrderType, PriceLevel, Ticker,
    Trade, TradingPair,
};
pub use error::{GatewayError, GatewayResult, UpstreamError};
pub use vault::{CredentialVault, EncryptedCredentials, EncryptedSecret};
