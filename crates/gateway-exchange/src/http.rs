//! 거래소 REST 호출 공용 전송 계층.
//!
//! 모든 어댑터는 이 모듈을 통해 HTTP 요청을 보냅니다.
//! - 클라이언트 단위 타임아웃 (무한 대기 없음)
//! - 전송 실패/타임아웃/HTTP 상태 코드 → [`UpstreamError`] 변환
//! - 응답 본문 역직렬화

use std::time::Duration;

use gateway_core::{ExchangeKind, GatewayError, GatewayResult, UpstreamError};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// 기본 요청 타임아웃.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// 어댑터 생성 옵션.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 기본 URL 재정의 (프록시, 테스트 서버 등). 설정 시 sandbox 여부와 무관하게 사용됩니다.
    pub base_url: Option<String>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
        }
    }
}

impl AdapterOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

/// 거래소별 HTTP 전송기.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    exchange: ExchangeKind,
}

impl HttpTransport {
    pub(crate) fn new(exchange: ExchangeKind, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::Configuration(format!("{} HTTP 클라이언트 생성 실패: {}", exchange, e))
        })?;
        Ok(Self { client, exchange })
    }

    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// 요청 전송 후 성공 응답 본문을 반환.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> GatewayResult<String> {
        let response = builder.send().await.map_err(|e| self.upstream(send_error(e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.upstream(send_error(e)))?;

        debug!(exchange = %self.exchange, status = status.as_u16(), "거래소 응답 수신");

        if !status.is_success() {
            return Err(self.upstream(status_error(status, text)));
        }
        Ok(text)
    }

    /// 요청 전송 후 JSON 응답 역직렬화.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> GatewayResult<T> {
        let text = self.send(builder).await?;
        self.parse_json(&text)
    }

    pub(crate) fn parse_json<T: DeserializeOwned>(&self, text: &str) -> GatewayResult<T> {
        serde_json::from_str::<T>(text).map_err(|e| {
            self.parse_error(format!("응답 파싱 실패: {}. Body: {}", e, truncate(text, 512)))
        })
    }

    pub(crate) fn upstream(&self, source: UpstreamError) -> GatewayError {
        GatewayError::upstream(self.exchange.as_str(), source)
    }

    pub(crate) fn parse_error(&self, message: impl Into<String>) -> GatewayError {
        self.upstream(UpstreamError::Parse(message.into()))
    }
}

/// reqwest 전송 에러 변환.
fn send_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(e.to_string())
    } else {
        UpstreamError::Network(e.to_string())
    }
}

/// HTTP 에러 상태 변환.
fn status_error(status: StatusCode, body: String) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            UpstreamError::Unauthorized(format!("HTTP {}: {}", status.as_u16(), truncate(&body, 512)))
        }
        _ => UpstreamError::Api {
            status: Some(status.as_u16()),
            message: truncate(&body, 512).to_string(),
        },
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
