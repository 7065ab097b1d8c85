//! 지원 거래소 카탈로그와 기본 어댑터 팩토리.

use std::collections::HashMap;

use gateway_core::{AdapterFactory, ExchangeAdapter, ExchangeKind, GatewayResult};
use serde::Serialize;
use tracing::debug;

use crate::{
    connector::{BinanceClient, CoinbaseClient, KrakenClient, KucoinClient},
    http::AdapterOptions,
};

// ============================================================================
// 거래소 카탈로그
// ============================================================================

/// 지원 거래소 정보.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeInfo {
    pub name: ExchangeKind,
    pub display_name: &'static str,
    pub description: &'static str,
    pub supported_features: &'static [&'static str],
    pub required_credentials: &'static [&'static str],
    pub supports_sandbox: bool,
}

const CATALOG: [ExchangeInfo; 4] = [
    ExchangeInfo {
        name: ExchangeKind::Coinbase,
        display_name: "Coinbase Advanced Trade",
        description: "Professional trading platform by Coinbase",
        supported_features: &["spot", "portfolio", "advanced_orders"],
        required_credentials: &["apiKey", "secretKey", "passphrase"],
        supports_sandbox: true,
    },
    ExchangeInfo {
        name: ExchangeKind::Binance,
        display_name: "Binance",
        description: "World's largest cryptocurrency exchange",
        supported_features: &["spot", "margin", "futures", "portfolio"],
        required_credentials: &["apiKey", "secretKey"],
        supports_sandbox: true,
    },
    ExchangeInfo {
        name: ExchangeKind::Kraken,
        display_name: "Kraken",
        description: "Secure and compliant digital asset exchange",
        supported_features: &["spot", "margin", "futures"],
        required_credentials: &["apiKey", "secretKey"],
        supports_sandbox: false,
    },
    ExchangeInfo {
        name: ExchangeKind::Kucoin,
        display_name: "KuCoin",
        description: "Global cryptocurrency exchange",
        supported_features: &["spot", "margin", "futures"],
        required_credentials: &["apiKey", "secretKey", "passphrase"],
        supports_sandbox: true,
    },
];

/// 지원 거래소 목록. 항상 같은 순서의 4개 항목을 반환합니다.
pub fn available_exchanges() -> Vec<ExchangeInfo> {
    CATALOG.to_vec()
}

// ============================================================================
// 기본 어댑터 팩토리
// ============================================================================

/// `ExchangeKind` → 실제 REST 커넥터 팩토리.
#[derive(Debug, Clone, Default)]
pub struct DefaultAdapterFactory {
    options: AdapterOptions,
    base_urls: HashMap<ExchangeKind, String>,
}

impl DefaultAdapterFactory {
    pub fn new(options: AdapterOptions) -> Self {
        Self {
            options,
            base_urls: HashMap::new(),
        }
    }

    /// 거래소별 기본 URL 재정의.
    pub fn with_base_url(mut self, exchange: ExchangeKind, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(exchange, base_url.into());
        self
    }

    fn options_for(&self, exchange: ExchangeKind) -> AdapterOptions {
        match self.base_urls.get(&exchange) {
            Some(url) => self.options.clone().with_base_url(url.clone()),
            None => self.options.clone(),
        }
    }
}

impl AdapterFactory for DefaultAdapterFactory {
    fn create(&self, exchange: ExchangeKind) -> GatewayResult<Box<dyn ExchangeAdapter>> {
        let options = self.options_for(exchange);
        debug!(%exchange, base_url = ?options.base_url, "어댑터 생성");

        Ok(match exchange {
            ExchangeKind::Coinbase => Box::new(CoinbaseClient::new(options)?),
            ExchangeKind::Binance => Box::new(BinanceClient::new(options)?),
            ExchangeKind::Kraken => Box::new(KrakenClient::new(options)?),
            ExchangeKind::Kucoin => Box::new(KucoinClient::new(options)?),
        })
    }
}
