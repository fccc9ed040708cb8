//! Shared domain types for Deckhand.
//!
//! Service identifiers, image references, the inbound publish event, webhook
//! outcomes, the opaque orchestrator service spec, configuration types and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, thiserror, secrecy.

pub mod config;
pub mod error;
pub mod event;
pub mod outcome;
pub mod service;
