//! Signature verifier trait definition.

use deckhand_types::error::SignatureError;

/// Checks that a webhook body was produced by a holder of the shared secret.
///
/// Implementations must operate on the raw body bytes exactly as received
/// and compare in constant time.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, body: &[u8], signature_header: Option<&str>) -> Result<(), SignatureError>;
}
