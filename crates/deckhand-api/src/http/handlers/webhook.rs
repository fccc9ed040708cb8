//! Webhook receiver handler.
//!
//! Hands the raw body bytes and the `x-hub-signature-256` header to the
//! [`WebhookProcessor`](deckhand_core::webhook::WebhookProcessor) and waits
//! for every service update to finish before answering, so the status code
//! reflects what actually happened.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::Instrument;
use uuid::Uuid;

use deckhand_core::orchestrator::Orchestrator;
use deckhand_types::event::SIGNATURE_HEADER;

use crate::http::response::OutcomeResponse;
use crate::state::AppState;

/// POST / - Receive a package webhook.
pub async fn receive_webhook<O: Orchestrator>(
    State(state): State<AppState<O>>,
    headers: HeaderMap,
    body: Bytes,
) -> OutcomeResponse {
    let start = Instant::now();
    let request_id = Uuid::now_v7();
    let span = tracing::info_span!("webhook", %request_id);

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .processor
        .handle_payload(&body, signature_header)
        .instrument(span.clone())
        .await;

    span.in_scope(|| {
        tracing::info!(
            status = outcome.status_code(),
            outcome = %outcome,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "webhook handled"
        );
    });

    OutcomeResponse(outcome)
}
