//! Coinbase Advanced Trade 커넥터.

mod client;

pub use client::{CoinbaseClient, ORDER_STATUS_TABLE};
