//! HMAC-SHA256 signatures in the hex form ZaloPay uses.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail.
    match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC can take key of any size"),
    }
}

/// Lowercase hex HMAC-SHA256 of `data` under `key`.
pub fn sign(key: &str, data: &str) -> String {
    let mut mac = keyed(key);
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a hex signature in constant time. Malformed hex never verifies.
pub fn verify(key: &str, data: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = keyed(key);
    mac.update(data.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_matches_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verify_accepts_own_signature() {
        let mac = sign("key2", "{\"app_trans_id\":\"240101_ABCD1234_123456\"}");
        assert!(verify("key2", "{\"app_trans_id\":\"240101_ABCD1234_123456\"}", &mac));
        assert!(verify(
            "key2",
            "{\"app_trans_id\":\"240101_ABCD1234_123456\"}",
            &mac.to_uppercase()
        ));
    }

    #[test]
    fn verify_rejects_tampering() {
        let mac = sign("key2", "amount=100");
        assert!(!verify("key2", "amount=1000", &mac));
        assert!(!verify("other", "amount=100", &mac));
        assert!(!verify("key2", "amount=100", "not-hex"));
        assert!(!verify("key2", "amount=100", ""));
    }
}
