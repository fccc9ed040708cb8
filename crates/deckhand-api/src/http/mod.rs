//! HTTP layer for Deckhand.
//!
//! Axum router with a single webhook endpoint at `POST /` and a health check.
//! Webhook responses are plain-text status tokens, not JSON.

pub mod handlers;
pub mod response;
pub mod router;
