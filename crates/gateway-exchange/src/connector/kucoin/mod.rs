//! KuCoin Spot 커넥터.

mod client;

pub use client::{KucoinClient, ORDER_STATUS_TABLE};
