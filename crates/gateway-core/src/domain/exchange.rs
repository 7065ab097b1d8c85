//! 지원 거래소 식별자.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// 게이트웨이가 지원하는 거래소.
///
/// 거래소 이름 문자열은 시작 시점에 이 enum으로 한 번만 변환되며,
/// 이후 어댑터 선택은 모두 이 값으로 분기합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Coinbase,
    Binance,
    Kraken,
    Kucoin,
}

impl ExchangeKind {
    /// 전체 거래소 목록 (카탈로그 순서).
    pub const ALL: [ExchangeKind; 4] = [
        ExchangeKind::Coinbase,
        ExchangeKind::Binance,
        ExchangeKind::Kraken,
        ExchangeKind::Kucoin,
    ];

    /// 거래소 이름 (소문자 리터럴).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coinbase => "coinbase",
            Self::Binance => "binance",
            Self::Kraken => "kraken",
            Self::Kucoin => "kucoin",
        }
    }

    /// passphrase가 필수인 거래소 여부.
    pub fn requires_passphrase(&self) -> bool {
        matches!(self, Self::Coinbase | Self::Kucoin)
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coinbase" => Ok(Self::Coinbase),
            "binance" => Ok(Self::Binance),
            "kraken" => Ok(Self::Kraken),
            "kucoin" => Ok(Self::Kucoin),
            _ => Err(GatewayError::UnsupportedExchange(s.to_string())),
        }
    }
}
