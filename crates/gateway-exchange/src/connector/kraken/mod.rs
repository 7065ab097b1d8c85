//! Kraken 커넥터.

mod client;

pub use client::{KrakenClient, ORDER_STATUS_TABLE};
