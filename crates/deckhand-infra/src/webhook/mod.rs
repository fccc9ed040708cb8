//! Webhook authentication.

pub mod signature;

pub use signature::{HmacSha256Verifier, compute_signature_header};
