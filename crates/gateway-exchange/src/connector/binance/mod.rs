//! Binance Spot 커넥터.

mod client;

pub use client::{BinanceClient, ORDER_STATUS_TABLE};
