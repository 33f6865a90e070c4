//! Webhook signature verification.
//!
//! The digest is computed over the exact byte sequence the provider signed.
//! Callers must hand in the raw request body before any JSON parsing —
//! re-serializing a parsed value is not guaranteed byte-identical.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use centra_billing_core::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 digest of the raw body.
pub const SIGNATURE_HEADER: &str = "paddle-signature";

/// Verify a webhook signature.
///
/// Fails closed: an empty secret or empty signature header rejects without
/// computing anything. Comparison is constant-time.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), WebhookError> {
    if webhook_secret.is_empty() {
        return Err(WebhookError::MissingSecret);
    }
    let signature = signature_header.trim();
    if signature.is_empty() {
        return Err(WebhookError::MissingSignature);
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        tracing::warn!("webhook signature mismatch");
        Err(WebhookError::InvalidSignature)
    }
}
