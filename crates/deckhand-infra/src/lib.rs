//! Infrastructure layer for Deckhand.
//!
//! Contains implementations of the collaborator traits defined in
//! `deckhand-core`: HMAC-SHA256 webhook signature verification, the Docker
//! Engine API client, and the layered configuration loader.

pub mod config;
pub mod docker;
pub mod webhook;
