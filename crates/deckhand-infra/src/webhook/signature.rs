//! HMAC-SHA256 webhook signatures (GitHub `X-Hub-Signature-256` style).
//!
//! Provides:
//! - `compute_signature_header()` -- `sha256=<hex>` over raw body bytes
//! - `HmacSha256Verifier` -- [`SignatureVerifier`] with constant-time comparison
//!
//! The digest is always computed over the body exactly as received. Parsing
//! and re-serialising the JSON would change key order or whitespace and
//! produce spurious mismatches.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use deckhand_core::webhook::SignatureVerifier;
use deckhand_types::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn compute_hmac_sha256_hex(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compute the full header value: `sha256=<lowercase hex>`.
pub fn compute_signature_header(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    Ok(format!("{SIGNATURE_PREFIX}{}", compute_hmac_sha256_hex(secret, body)?))
}

/// Verifies `x-hub-signature-256` headers against a shared secret.
///
/// The header must equal `sha256=` followed by the lowercase hex digest;
/// unprefixed or uppercase values are rejected.
pub struct HmacSha256Verifier {
    secret: SecretString,
}

impl HmacSha256Verifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl SignatureVerifier for HmacSha256Verifier {
    fn verify(&self, body: &[u8], signature_header: Option<&str>) -> Result<(), SignatureError> {
        let provided = signature_header.ok_or(SignatureError::Missing)?;
        let expected = compute_signature_header(self.secret.expose_secret().as_bytes(), body)?;

        if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Constant-time byte comparison (XOR-based).
///
/// Returns true if and only if `a == b`. Time taken is independent of
/// how many bytes match.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
