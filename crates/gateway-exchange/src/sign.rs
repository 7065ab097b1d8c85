//! 요청 서명 유틸리티.
//!
//! 거래소별 서명 방식의 공통 빌딩 블록 (HMAC-SHA256/512 + hex/base64 인코딩).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use gateway_core::{GatewayError, GatewayResult};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

fn hmac_sha256(secret: &[u8], message: &[u8]) -> GatewayResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| GatewayError::validation(format!("HMAC 키가 올바르지 않습니다: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// HMAC-SHA256, hex 인코딩.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> GatewayResult<String> {
    hmac_sha256(secret, message).map(hex::encode)
}

/// HMAC-SHA256, base64 인코딩.
pub fn hmac_sha256_base64(secret: &[u8], message: &[u8]) -> GatewayResult<String> {
    hmac_sha256(secret, message).map(|digest| STANDARD.encode(digest))
}

/// HMAC-SHA512, base64 인코딩.
pub fn hmac_sha512_base64(secret: &[u8], message: &[u8]) -> GatewayResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| GatewayError::validation(format!("HMAC 키가 올바르지 않습니다: {}", e)))?;
    mac.update(message);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// SHA-256 다이제스트 (raw bytes).
pub fn sha256(message: &[u8]) -> Vec<u8> {
    Sha256::digest(message).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 Test Case 2
    const RFC4231_KEY: &[u8] = b"Jefe";
    const RFC4231_DATA: &[u8] = b"what do ya want for nothing?";

    #[test]
    fn test_hmac_sha256_hex_rfc4231() {
        assert_eq!(
            hmac_sha256_hex(RFC4231_KEY, RFC4231_DATA).unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_sha256_base64_rfc4231() {
        assert_eq!(
            hmac_sha256_base64(RFC4231_KEY, RFC4231_DATA).unwrap(),
            "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM="
        );
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
