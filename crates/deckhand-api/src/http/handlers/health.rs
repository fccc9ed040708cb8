use axum::Json;
use axum::extract::State;

use deckhand_core::orchestrator::Orchestrator;

use crate::state::AppState;

/// GET /health - liveness probe with the number of configured services.
pub async fn health_check<O: Orchestrator>(State(state): State<AppState<O>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": state.processor.registry().len(),
    }))
}
