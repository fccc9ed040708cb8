//! Business logic and collaborator trait definitions for Deckhand.
//!
//! This crate owns the service registry and the webhook processor, and
//! defines the "ports" (orchestrator and signature verifier traits) that the
//! infrastructure layer implements. It depends only on `deckhand-types` --
//! never on `deckhand-infra` or any HTTP/crypto crate.

pub mod orchestrator;
pub mod registry;
pub mod webhook;
