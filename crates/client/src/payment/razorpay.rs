//! Razorpay callback signatures.
//!
//! Razorpay signs a successful payment as the hex HMAC-SHA256 of
//! `"{order_id}|{payment_id}"` keyed with the account's key secret.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::SignedPayment;

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature Razorpay would send for a payment.
///
/// # Errors
///
/// Returns `InvalidLength` if the key is rejected by the MAC.
pub fn signature(
    secret: &SecretString,
    gateway_order_id: &str,
    payment_id: &str,
) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())?;
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a callback's signature in constant time.
#[must_use]
pub fn verify(secret: &SecretString, payment: &SignedPayment) -> bool {
    let Ok(expected) = signature(secret, &payment.gateway_order_id, &payment.payment_id) else {
        return false;
    };
    expected
        .as_bytes()
        .ct_eq(payment.signature.to_ascii_lowercase().as_bytes())
        .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("test_key_secret")
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = signature(&secret(), "order_ABC", "pay_XYZ").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let payment = SignedPayment {
            gateway_order_id: "order_ABC".to_string(),
            payment_id: "pay_XYZ".to_string(),
            signature: signature(&secret(), "order_ABC", "pay_XYZ").unwrap(),
        };
        assert!(verify(&secret(), &payment));
    }

    #[test]
    fn test_verify_rejects_tampered_payment() {
        let payment = SignedPayment {
            gateway_order_id: "order_ABC".to_string(),
            payment_id: "pay_OTHER".to_string(),
            signature: signature(&secret(), "order_ABC", "pay_XYZ").unwrap(),
        };
        assert!(!verify(&secret(), &payment));

        let wrong_key = SecretString::from("another_secret");
        let payment = SignedPayment {
            gateway_order_id: "order_ABC".to_string(),
            payment_id: "pay_XYZ".to_string(),
            signature: signature(&wrong_key, "order_ABC", "pay_XYZ").unwrap(),
        };
        assert!(!verify(&secret(), &payment));
    }

    #[test]
    fn test_verify_rejects_truncated_signature() {
        let mut sig = signature(&secret(), "order_ABC", "pay_XYZ").unwrap();
        sig.truncate(10);
        let payment = SignedPayment {
            gateway_order_id: "order_ABC".to_string(),
            payment_id: "pay_XYZ".to_string(),
            signature: sig,
        };
        assert!(!verify(&secret(), &payment));
    }
}
