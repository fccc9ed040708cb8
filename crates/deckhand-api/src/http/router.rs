//! Axum router configuration with middleware.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use deckhand_core::orchestrator::Orchestrator;

use crate::http::handlers;
use crate::state::AppState;

/// Build the router: `POST /` for webhooks, `GET /health` for probes.
pub fn build_router<O>(state: AppState<O>) -> Router
where
    O: Orchestrator + 'static,
{
    Router::new()
        .route("/", post(handlers::webhook::receive_webhook::<O>))
        .route("/health", get(handlers::health::health_check::<O>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
