//! Application state wiring the webhook processor together.
//!
//! The processor is generic over the orchestrator; `serve` pins it to
//! `DockerOrchestrator`, or to `InMemoryOrchestrator` for `--dry-run`.

use std::sync::Arc;
use std::time::Duration;

use deckhand_core::orchestrator::Orchestrator;
use deckhand_core::registry::ServiceRegistry;
use deckhand_core::webhook::{ProcessorOptions, WebhookProcessor};
use deckhand_infra::webhook::HmacSha256Verifier;
use deckhand_types::config::DeckhandConfig;

/// Concrete processor type used by the HTTP handlers.
pub type Processor<O> = WebhookProcessor<O, HmacSha256Verifier>;

/// Shared state for the HTTP handlers.
pub struct AppState<O> {
    pub processor: Arc<Processor<O>>,
}

impl<O> Clone for AppState<O> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<O: Orchestrator> AppState<O> {
    /// Wire the registry, orchestrator and signature verifier into a processor.
    pub fn new(config: &DeckhandConfig, registry: Arc<ServiceRegistry>, orchestrator: O) -> Self {
        let options = ProcessorOptions {
            call_timeout: Duration::from_secs(config.docker.timeout_secs),
            update_concurrency: config.docker.update_concurrency,
        };
        let verifier = HmacSha256Verifier::new(config.secret.clone());

        Self {
            processor: Arc::new(WebhookProcessor::new(
                registry,
                orchestrator,
                verifier,
                options,
            )),
        }
    }
}
