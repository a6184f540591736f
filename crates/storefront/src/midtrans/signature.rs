//! HTTP notification signatures.
//!
//! Midtrans signs each notification with
//! `SHA512(order_id + status_code + gross_amount + server_key)`, hex encoded.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};

use super::MidtransError;

/// Compute the expected signature for a notification.
#[must_use]
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &SecretString,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a notification's `signature_key`.
///
/// # Errors
///
/// Returns `MidtransError::InvalidSignature` on mismatch.
pub fn verify_notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    signature_key: &str,
    server_key: &SecretString,
) -> Result<(), MidtransError> {
    let expected = notification_signature(order_id, status_code, gross_amount, server_key);

    if !constant_time_compare(&expected, &signature_key.to_ascii_lowercase()) {
        return Err(MidtransError::InvalidSignature);
    }
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("SB-Mid-server-T3stK3yF0rUn1tT3sts")
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_signature_is_sha512_hex() {
        let sig = notification_signature("PTR-1", "200", "100000.00", &key());
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_known_value() {
        // sha512("") is a well-known digest.
        let empty = notification_signature("", "", "", &SecretString::from(""));
        assert!(empty.starts_with("cf83e1357eefb8bdf1542850d66d8007"));
    }

    #[test]
    fn test_verify_valid() {
        let sig = notification_signature("PTR-1", "200", "100000.00", &key());
        assert!(verify_notification_signature("PTR-1", "200", "100000.00", &sig, &key()).is_ok());
        assert!(
            verify_notification_signature(
                "PTR-1",
                "200",
                "100000.00",
                &sig.to_ascii_uppercase(),
                &key()
            )
            .is_ok()
        );
    }

    #[test]
    fn test_verify_tampered_amount() {
        let sig = notification_signature("PTR-1", "200", "100000.00", &key());
        let result = verify_notification_signature("PTR-1", "200", "1000.00", &sig, &key());
        assert!(matches!(result, Err(MidtransError::InvalidSignature)));
    }

    #[test]
    fn test_verify_wrong_key() {
        let sig = notification_signature(
            "PTR-1",
            "200",
            "100000.00",
            &SecretString::from("SB-Mid-server-another-key"),
        );
        let result = verify_notification_signature("PTR-1", "200", "100000.00", &sig, &key());
        assert!(matches!(result, Err(MidtransError::InvalidSignature)));
    }
}
