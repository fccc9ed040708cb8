//! Webhook processing: signature verification port and the gate pipeline
//! that turns a publish event into service updates.

pub mod processor;
pub mod verifier;

pub use processor::{ProcessorOptions, WebhookProcessor};
pub use verifier::SignatureVerifier;
