//! 거래소 어댑터 구현.
//!
//! Coinbase, Binance, Kraken, KuCoin REST API를 [`gateway_core::ExchangeAdapter`]로 감쌉니다.
//!
//! # 모듈 구성
//!
//! - [`connector`]: 거래소별 REST 커넥터 (서명, 요청, 응답 변환)
//! - [`catalog`]: 지원 거래소 카탈로그와 [`DefaultAdapterFactory`]
//! - [`mock`]: 네트워크 없는 [`MockAdapter`]
//! - [`http`]: 공용 HTTP 전송 계층과 [`AdapterOptions`]
//! - [`sign`]: HMAC 서명 유틸리티

pub mod catalog;
pub mod connector;
pub mod http;
pub mod mock;
mod parse;
pub mod sign;

pub use catalog::{available_exchanges, DefaultAdapterFactory, ExchangeInfo};
pub use connector::{BinanceClient, CoinbaseClient, KrakenClient, KucoinClient};
pub use http::{AdapterOptions, DEFAULT_TIMEOUT};
pub use mock::{MockAdapter, MockAdapterFactory, MockFailure, MockProfile};
