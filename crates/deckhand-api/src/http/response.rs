//! Mapping of webhook outcomes onto HTTP responses.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use deckhand_types::outcome::WebhookOutcome;

/// A [`WebhookOutcome`] rendered as `status code + plain-text token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeResponse(pub WebhookOutcome);

impl IntoResponse for OutcomeResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.token(),
        )
            .into_response()
    }
}
