//! 자격 증명 암호화 (Credential Vault).
//!
//! AES-256-GCM으로 API 자격 증명을 암호화합니다.
//! 호출마다 새 96비트 IV를 생성하므로 같은 평문도 매번 다른 암호문이 됩니다.
//! 복호화 실패(변조, 잘못된 키)는 `GatewayError::Decryption`이며 복구하지 않습니다.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::{
    domain::ExchangeCredentials,
    error::{GatewayError, GatewayResult},
};

/// AES-256 키 길이 (바이트).
pub const KEY_LEN: usize = 32;
/// GCM IV 길이 (바이트).
pub const IV_LEN: usize = 12;

/// 암호화된 값 (base64 인코딩).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub iv: String,
}

/// 암호화된 자격 증명 묶음.
///
/// 인스턴스 저장소에는 이 형태로만 보관됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredentials {
    pub api_key: EncryptedSecret,
    pub secret_key: EncryptedSecret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<EncryptedSecret>,
    #[serde(default)]
    pub sandbox: bool,
}

/// 프로세스 전역 키를 사용하는 자격 증명 암호화기.
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("key", &"***")
            .finish()
    }
}

impl CredentialVault {
    /// 32바이트 키로 생성.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// base64 인코딩된 키로 생성.
    pub fn from_base64_key(encoded: &str) -> GatewayResult<Self> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            GatewayError::Configuration(format!("암호화 키 base64 디코딩 실패: {}", e))
        })?;
        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            GatewayError::Configuration(format!(
                "암호화 키는 정확히 {}바이트여야 합니다 (현재 {}바이트)",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::new(&key))
    }

    /// 무작위 키로 생성 (프로세스 수명 동안만 유효).
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self::new(&key)
    }

    /// 평문 암호화.
    pub fn encrypt(&self, plaintext: &str) -> GatewayResult<EncryptedSecret> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| GatewayError::Configuration(format!("암호화 실패: {}", e)))?;

        Ok(EncryptedSecret {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
        })
    }

    /// 암호문 복호화.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> GatewayResult<String> {
        let iv = STANDARD
            .decode(&secret.iv)
            .map_err(|e| GatewayError::Decryption(format!("IV 디코딩 실패: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(GatewayError::Decryption(format!(
                "IV 길이가 올바르지 않습니다: {}",
                iv.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(&secret.ciphertext)
            .map_err(|e| GatewayError::Decryption(format!("암호문 디코딩 실패: {}", e)))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| GatewayError::Decryption("인증 태그 불일치".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| GatewayError::Decryption(format!("UTF-8 변환 실패: {}", e)))
    }

    /// 자격 증명 전체 암호화.
    pub fn encrypt_credentials(
        &self,
        credentials: &ExchangeCredentials,
    ) -> GatewayResult<EncryptedCredentials> {
        Ok(EncryptedCredentials {
            api_key: self.encrypt(credentials.api_key())?,
            secret_key: self.encrypt(credentials.secret_key())?,
            passphrase: credentials
                .passphrase()
                .map(|p| self.encrypt(p))
                .transpose()?,
            sandbox: credentials.sandbox(),
        })
    }

    /// 자격 증명 전체 복호화. 하나라도 실패하면 전체가 실패합니다.
    pub fn decrypt_credentials(
        &self,
        encrypted: &EncryptedCredentials,
    ) -> GatewayResult<ExchangeCredentials> {
        let mut credentials = ExchangeCredentials::new(
            self.decrypt(&encrypted.api_key)?,
            self.decrypt(&encrypted.secret_key)?,
        )
        .with_sandbox(encrypted.sandbox);

        if let Some(passphrase) = &encrypted.passphrase {
            credentials = credentials.with_passphrase(self.decrypt(passphrase)?);
        }
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_is_non_deterministic() {
        let vault = CredentialVault::generate();
        let a = vault.encrypt("api-secret").unwrap();
        let b = vault.encrypt("api-secret").unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(vault.decrypt(&a).unwrap(), "api-secret");
        assert_eq!(vault.decrypt(&b).unwrap(), "api-secret");
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let vault = CredentialVault::generate();
        let mut secret = vault.encrypt("api-secret").unwrap();

        let mut bytes = STANDARD.decode(&secret.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        secret.ciphertext = STANDARD.encode(bytes);

        assert!(matches!(vault.decrypt(&secret), Err(GatewayError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_tampered_iv() {
        let vault = CredentialVault::generate();
        let mut secret = vault.encrypt("api-secret").unwrap();
        secret.iv = STANDARD.encode([7u8; IV_LEN]);
        assert!(matches!(vault.decrypt(&secret), Err(GatewayError::Decryption(_))));

        secret.iv = "not base64!".to_string();
        assert!(matches!(vault.decrypt(&secret), Err(GatewayError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let secret = CredentialVault::generate().encrypt("api-secret").unwrap();
        let other = CredentialVault::generate();
        assert!(matches!(other.decrypt(&secret), Err(GatewayError::Decryption(_))));
    }

    #[test]
    fn test_from_base64_key() {
        let key = STANDARD.encode([42u8; KEY_LEN]);
        let vault = CredentialVault::from_base64_key(&key).unwrap();
        let secret = vault.encrypt("hello").unwrap();

        let same = CredentialVault::from_base64_key(&key).unwrap();
        assert_eq!(same.decrypt(&secret).unwrap(), "hello");

        let short = STANDARD.encode([1u8; 16]);
        assert!(matches!(
            CredentialVault::from_base64_key(&short),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn test_credentials_round_trip() {
        let vault = CredentialVault::generate();
        let creds = ExchangeCredentials::new("key", "secret")
            .with_passphrase("pass")
            .with_sandbox(true);

        let encrypted = vault.encrypt_credentials(&creds).unwrap();
        assert!(encrypted.sandbox);
        assert!(encrypted.passphrase.is_some());

        let decrypted = vault.decrypt_credentials(&encrypted).unwrap();
        assert_eq!(decrypted.api_key(), "key");
        assert_eq!(decrypted.secret_key(), "secret");
        assert_eq!(decrypted.passphrase(), Some("pass"));
        assert!(decrypted.sandbox());
    }
}
