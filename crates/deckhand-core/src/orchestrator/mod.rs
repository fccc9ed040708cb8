//! Container orchestrator trait definitions.
//!
//! Implementations live in deckhand-infra (e.g., `DockerOrchestrator`), plus
//! the in-process [`memory::InMemoryOrchestrator`] used for dry runs and tests.
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

pub mod memory;

use deckhand_types::error::OrchestratorError;
use deckhand_types::service::{ServiceId, ServiceSnapshot, UpdateReceipt, VersionedSpec};

/// Entry point into the orchestration system.
pub trait Orchestrator: Send + Sync {
    /// Handle type addressing one service.
    type Handle: ServiceHandle;

    /// Address a service by id. Performs no I/O; a missing service surfaces
    /// as [`OrchestratorError::NotFound`] on the first call through the handle.
    fn get_service(&self, id: &ServiceId) -> Self::Handle;
}

/// Operations on a single orchestrated service.
pub trait ServiceHandle: Send + Sync {
    /// The service this handle addresses.
    fn id(&self) -> &ServiceId;

    /// Read the current spec and its version token.
    fn inspect(
        &self,
    ) -> impl std::future::Future<Output = Result<ServiceSnapshot, OrchestratorError>> + Send;

    /// Submit a new spec. The orchestrator rejects a stale version token.
    fn update(
        &self,
        spec: VersionedSpec,
    ) -> impl std::future::Future<Output = Result<UpdateReceipt, OrchestratorError>> + Send;
}
