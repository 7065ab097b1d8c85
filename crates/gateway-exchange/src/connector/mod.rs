//! 거래소별 REST 커넥터.
//!
//! 각 커넥터는 [`gateway_core::ExchangeAdapter`]를 구현합니다.

pub mod binance;
pub mod coinbase;
pub mod kraken;
pub mod kucoin;

pub use binance::BinanceClient;
pub use coinbase::CoinbaseClient;
pub use kraken::KrakenClient;
pub use kucoin::KucoinClient;
