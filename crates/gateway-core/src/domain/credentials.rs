//! 거래소 API 자격 증명.

use secrecy::{ExposeSecret, SecretString};

use crate::{
    domain::ExchangeKind,
    error::{GatewayError, GatewayResult},
};

/// 거래소 API 자격 증명 (평문).
///
/// 어댑터 인스턴스가 단독으로 소유하며, 응답으로 직렬화되지 않습니다.
/// 복제가 필요한 경우 Vault로 암호화한 형태를 사용하세요.
pub struct ExchangeCredentials {
    api_key: String,
    secret_key: SecretString,
    passphrase: Option<SecretString>,
    sandbox: bool,
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            passphrase: None,
            sandbox: false,
        }
    }

    /// passphrase 설정 (Coinbase, KuCoin).
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    /// 샌드박스/테스트넷 사용 여부 설정.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.expose_secret())
    }

    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    /// 거래소별 필수 필드 검증.
    pub fn validate_for(&self, exchange: ExchangeKind) -> GatewayResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::validation(format!(
                "{} apiKey가 비어 있습니다",
                exchange
            )));
        }
        if self.secret_key().trim().is_empty() {
            return Err(GatewayError::validation(format!(
                "{} secretKey가 비어 있습니다",
                exchange
            )));
        }
        if exchange.requires_passphrase()
            && self.passphrase().map(|p| p.trim().is_empty()).unwrap_or(true)
        {
            return Err(GatewayError::validation(format!(
                "{}는 passphrase가 필요합니다",
                exchange
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_secrets() {
        let creds = ExchangeCredentials::new("my-key", "my-secret").with_passphrase("my-pass");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("my-key"));
        assert!(!debug.contains("my-secret"));
        assert!(!debug.contains("my-pass"));
    }

    #[test]
    fn test_passphrase_required() {
        let creds = ExchangeCredentials::new("key", "secret");
        assert!(creds.validate_for(ExchangeKind::Binance).is_ok());
        assert!(creds.validate_for(ExchangeKind::Kraken).is_ok());
        assert!(matches!(
            creds.validate_for(ExchangeKind::Kucoin),
            Err(GatewayError::Validation(_))
        ));

        let creds = ExchangeCredentials::new("key", "secret").with_passphrase("pass");
        assert!(creds.validate_for(ExchangeKind::Coinbase).is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let creds = ExchangeCredentials::new("", "secret");
        assert!(creds.validate_for(ExchangeKind::Binance).is_err());

        let creds = ExchangeCredentials::new("key", " ");
        assert!(creds.validate_for(ExchangeKind::Binance).is_err());
    }
}
