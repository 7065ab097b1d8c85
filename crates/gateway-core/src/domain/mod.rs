//! 도메인 타입 및 trait.

mod adapter;
mod credentials;
mod exchange;
mod types;

pub use adapter::{AdapterFactory, ExchangeAdapter};
pub use credentials::ExchangeCredentials;
pub use exchange::ExchangeKind;
pub use types::{
    now_millis, Balance, Order, OrderBookSnapshot, OrderRequest, OrderSide, OrderStatus,
    OrderType, PriceLevel, Ticker, Trade, TradingPair,
};
