//! 환경변수 기반 설정 모듈.

use std::{collections::HashMap, time::Duration};

use gateway_core::{CredentialVault, ExchangeKind, GatewayResult};
use tracing::warn;

/// 게이트웨이 전체 설정
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 자격 증명 암호화 키 (base64, 32바이트). 없으면 프로세스 수명 동안만 유효한 임시 키 사용
    pub encryption_key: Option<String>,
    /// 레이트 리미터 설정
    pub rate_limit: RateLimitConfig,
    /// 거래소 HTTP 요청 타임아웃 (초)
    /// 기본값: 10
    pub request_timeout_secs: u64,
    /// 거래소별 기본 URL 재정의 (`GATEWAY_<EXCHANGE>_BASE_URL`)
    pub base_urls: HashMap<ExchangeKind, String>,
}

/// 레이트 리미터 설정
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 요청 수
    /// 기본값: 100
    pub max_requests: usize,
    /// 슬라이딩 윈도우 길이 (초)
    /// 기본값: 60
    pub window_secs: u64,
    /// 유휴 키 정리 주기 (초)
    /// 기본값: 300
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            rate_limit: RateLimitConfig::default(),
            request_timeout_secs: 10,
            base_urls: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// 환경변수에서 설정 로드.
    ///
    /// `.env` 파일이 있으면 먼저 읽습니다.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_urls = ExchangeKind::ALL
            .into_iter()
            .filter_map(|exchange| {
                let key = format!("GATEWAY_{}_BASE_URL", exchange.as_str().to_uppercase());
                std::env::var(key)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|url| (exchange, url))
            })
            .collect();

        Self {
            encryption_key: std::env::var("GATEWAY_ENCRYPTION_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            rate_limit: RateLimitConfig {
                max_requests: env_var_parse("GATEWAY_RATE_LIMIT_MAX_REQUESTS", 100),
                window_secs: env_var_parse("GATEWAY_RATE_LIMIT_WINDOW_SECS", 60),
                sweep_interval_secs: env_var_parse("GATEWAY_LIMITER_SWEEP_SECS", 300),
            },
            request_timeout_secs: env_var_parse("GATEWAY_REQUEST_TIMEOUT_SECS", 10),
            base_urls,
        }
    }

    /// 거래소 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 설정된 키로 Vault 생성.
    ///
    /// 키가 없으면 임시 키를 생성하며, 재시작 후에는 저장된 자격 증명을 복호화할 수 없습니다.
    pub fn build_vault(&self) -> GatewayResult<CredentialVault> {
        match &self.encryption_key {
            Some(key) => CredentialVault::from_base64_key(key),
            None => {
                warn!("GATEWAY_ENCRYPTION_KEY 미설정: 임시 암호화 키를 사용합니다");
                Ok(CredentialVault::generate())
            }
        }
    }
}

impl RateLimitConfig {
    /// 슬라이딩 윈도우를 Duration으로 반환
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// 유휴 키 정리 주기를 Duration으로 반환
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
