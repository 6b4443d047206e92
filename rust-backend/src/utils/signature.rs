//! Generic HMAC-SHA256 signing helpers shared by every adapter's `Signer`
//! implementation (see `adapter::signer`). Brokerage REST/WS auth schemes
//! overwhelmingly boil down to `base64(hmac_sha256(secret, prehash))` or the
//! hex-encoded equivalent, keyed by a timestamp + nonce + request shape.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// `base64(hmac_sha256(secret, message))`
pub fn hmac_sha256_base64(secret: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts key of any length");
    mac.update(message.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// `hex(hmac_sha256(secret, message))`
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts key of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a hex-encoded signature against a freshly
/// computed one, so adapters that validate inbound webhook/WS frames don't
/// leak timing information.
pub fn verify_hmac_hex(secret: &str, message: &[u8], given_hex: &str) -> bool {
    let Ok(given) = hex::decode(given_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts key of any length");
    mac.update(message);
    mac.finalize().into_bytes().ct_eq(&given).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Deterministic vectors, cross-checked against a reference HMAC-SHA256
    // implementation offline.
    const SECRET: &str = "mysecret";
    const MESSAGE: &str = "/api/v1/orderPOST1690000000000nonce123{\"foo\":1}";
    const EXPECT_BASE64: &str = "Jg5/kwP/ixremCZCe9Wzb8e0jA/FXxjJsFxEUJVrsx0=";

    #[test]
    fn base64_signature_matches_reference() {
        assert_eq!(hmac_sha256_base64(SECRET, MESSAGE), EXPECT_BASE64);
    }

    #[test]
    fn hex_roundtrip_verifies() {
        let sig = hmac_sha256_hex(SECRET, MESSAGE.as_bytes());
        assert!(verify_hmac_hex(SECRET, MESSAGE.as_bytes(), &sig));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let sig = hmac_sha256_hex(SECRET, MESSAGE.as_bytes());
        assert!(!verify_hmac_hex(SECRET, b"tampered", &sig));
    }

    #[test]
    fn malformed_hex_does_not_panic() {
        assert!(!verify_hmac_hex(SECRET, MESSAGE.as_bytes(), "not-hex"));
    }

    #[test]
    fn empty_secret_still_hashes() {
        let sig = hmac_sha256_base64("", "x");
        assert!(!sig.is_empty());
    }
}
