//! Webhook and per-service update outcomes.

use std::fmt;

use crate::error::OrchestratorError;
use crate::service::{ServiceId, UpdateReceipt};

/// Terminal result of processing one webhook delivery.
///
/// Each variant maps to a fixed HTTP status code and a plain-text token that
/// forms the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookOutcome {
    /// All matched services were updated.
    Ok,
    /// `action` was not `published`.
    IgnoringInvalidAction,
    /// `package.package_version.package_url` missing or empty.
    MissingPackageUrl,
    /// Signature header absent or not matching the payload.
    InvalidSignature,
    /// No configured service tracks the published package.
    NoServiceFound,
    /// An orchestrator call failed during the update fan-out.
    ErrorUpdatingService,
}

impl WebhookOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookOutcome::Ok => 200,
            WebhookOutcome::ErrorUpdatingService => 500,
            _ => 400,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            WebhookOutcome::Ok => "OK",
            WebhookOutcome::IgnoringInvalidAction => "IGNORING_INVALID_ACTION",
            WebhookOutcome::MissingPackageUrl => "INVALID_PAYLOAD_MISSING_PACKAGE_URL",
            WebhookOutcome::InvalidSignature => "INVALID_SIGNATURE",
            WebhookOutcome::NoServiceFound => "NO_SERVICE_FOUND_FOR_PACKAGE_URL",
            WebhookOutcome::ErrorUpdatingService => "ERROR_UPDATING_SERVICE",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WebhookOutcome::Ok)
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Outcome of updating a single matched service.
#[derive(Debug, Clone)]
pub struct ServiceUpdateOutcome {
    pub service_id: ServiceId,
    pub result: Result<UpdateReceipt, OrchestratorError>,
}

impl ServiceUpdateOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
