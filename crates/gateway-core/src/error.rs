//! 게이트웨이 에러 타입.
//!
//! 어댑터, 레지스트리, 레이트 리미터, 파사드가 모두 같은 에러 타입을 사용하므로
//! 어댑터 단의 에러가 변환 없이 호출자까지 전달됩니다.

use thiserror::Error;

/// 게이트웨이 결과 타입 별칭.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// 업스트림 (거래소) 에러
// =============================================================================

/// 거래소 API 호출 실패 원인.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 네트워크 에러 (연결 실패, 요청 전송 실패 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 시간 초과
    #[error("요청 시간 초과: {0}")]
    Timeout(String),

    /// 인증 실패 (잘못된 API 키, 서명 오류 등)
    #[error("인증 실패: {0}")]
    Unauthorized(String),

    /// 거래소 API 에러 응답
    #[error("API 에러 (status={status:?}): {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// 응답 파싱 실패
    #[error("파싱 에러: {0}")]
    Parse(String),
}

// =============================================================================
// 게이트웨이 에러
// =============================================================================

/// 게이트웨이 에러.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 자격 증명 설정 전에 어댑터를 사용함
    #[error("{exchange} 어댑터에 자격 증명이 설정되지 않았습니다")]
    NotConfigured { exchange: String },

    /// 지원하지 않는 거래소 이름
    #[error("지원하지 않는 거래소: {0}")]
    UnsupportedExchange(String),

    /// 사용자에게 해당 인스턴스가 없음
    #[error("연결된 거래소를 찾을 수 없습니다: {instance_key}")]
    NotFound {
        user_id: String,
        instance_key: String,
    },

    /// 요청 한도 초과
    #[error("{key} 요청 한도 초과. {retry_after_secs}초 후 다시 시도하세요")]
    RateLimitExceeded { key: String, retry_after_secs: u64 },

    /// 자격 증명 복호화 실패 (복구 불가)
    #[error("자격 증명 복호화 실패: {0}")]
    Decryption(String),

    /// 거래소 호출 실패 (자동 재시도 없음)
    #[error("{exchange} 거래소 호출 실패: {source}")]
    Upstream {
        exchange: String,
        #[source]
        source: UpstreamError,
    },

    /// 잘못된 입력
    #[error("잘못된 요청: {0}")]
    Validation(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// 업스트림 에러 생성.
    pub fn upstream(exchange: impl Into<String>, source: UpstreamError) -> Self {
        Self::Upstream {
            exchange: exchange.into(),
            source,
        }
    }

    /// 검증 에러 생성.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 라우트 레이어에서 HTTP 상태 코드로 변환할 때 쓰는 에러 종류 이름.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "not_configured",
            Self::UnsupportedExchange(_) => "unsupported_exchange",
            Self::NotFound { .. } => "not_found",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::Decryption(_) => "decryption",
            Self::Upstream { .. } => "upstream",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
        }
    }

    /// 거래소 인증 실패 여부.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                source: UpstreamError::Unauthorized(_),
                ..
            }
        )
    }

    /// 요청 시간 초과 여부.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                source: UpstreamError::Timeout(_),
                ..
            }
        )
    }
}
