//! In-process orchestrator.
//!
//! Holds service specs in a `DashMap` and enforces the same optimistic
//! concurrency rule as Swarm: an update must carry the current version token,
//! and every accepted update bumps it. Every call is recorded so callers can
//! see exactly what a webhook would have done. Backs `serve --dry-run`.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde_json::json;

use deckhand_types::error::OrchestratorError;
use deckhand_types::service::{
    ServiceId, ServiceSnapshot, ServiceSpec, UpdateReceipt, VersionToken, VersionedSpec,
};

use super::{Orchestrator, ServiceHandle};

/// A call observed by the in-memory orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorCall {
    Inspect(ServiceId),
    Update {
        service_id: ServiceId,
        image: Option<String>,
        version: VersionToken,
    },
}

#[derive(Debug)]
struct MemoryService {
    spec: ServiceSpec,
    version: VersionToken,
    update_failure: Option<OrchestratorError>,
}

#[derive(Debug, Default)]
struct Inner {
    services: DashMap<ServiceId, MemoryService>,
    calls: Mutex<Vec<OrchestratorCall>>,
    auto_create: bool,
}

impl Inner {
    fn record(&self, call: OrchestratorCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Orchestrator backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrchestrator {
    inner: Arc<Inner>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An orchestrator that materialises a minimal spec for any service on
    /// first inspection instead of reporting it missing.
    pub fn auto_create() -> Self {
        Self {
            inner: Arc::new(Inner {
                auto_create: true,
                ..Inner::default()
            }),
        }
    }

    /// Add (or replace) a service at version 1.
    pub fn insert_service(&self, id: &ServiceId, spec: ServiceSpec) {
        self.inner.services.insert(
            id.clone(),
            MemoryService {
                spec,
                version: VersionToken(1),
                update_failure: None,
            },
        );
    }

    /// Make every subsequent update of `id` fail with `error`.
    pub fn fail_updates(&self, id: &ServiceId, error: OrchestratorError) {
        if let Some(mut service) = self.inner.services.get_mut(id) {
            service.update_failure = Some(error);
        }
    }

    /// Current state of a service, if it exists.
    pub fn snapshot(&self, id: &ServiceId) -> Option<ServiceSnapshot> {
        self.inner.services.get(id).map(|s| ServiceSnapshot {
            spec: s.spec.clone(),
            version: s.version,
        })
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<OrchestratorCall> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Orchestrator for InMemoryOrchestrator {
    type Handle = MemoryServiceHandle;

    fn get_service(&self, id: &ServiceId) -> MemoryServiceHandle {
        MemoryServiceHandle {
            id: id.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to one service of an [`InMemoryOrchestrator`].
#[derive(Debug, Clone)]
pub struct MemoryServiceHandle {
    id: ServiceId,
    inner: Arc<Inner>,
}

impl ServiceHandle for MemoryServiceHandle {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    async fn inspect(&self) -> Result<ServiceSnapshot, OrchestratorError> {
        self.inner.record(OrchestratorCall::Inspect(self.id.clone()));

        if !self.inner.auto_create && !self.inner.services.contains_key(&self.id) {
            return Err(OrchestratorError::NotFound(self.id.to_string()));
        }

        let service = self
            .inner
            .services
            .entry(self.id.clone())
            .or_insert_with(|| MemoryService {
                spec: ServiceSpec::new(json!({ "Name": self.id.as_str() })),
                version: VersionToken(0),
                update_failure: None,
            });
        Ok(ServiceSnapshot {
            spec: service.spec.clone(),
            version: service.version,
        })
    }

    async fn update(&self, new: VersionedSpec) -> Result<UpdateReceipt, OrchestratorError> {
        self.inner.record(OrchestratorCall::Update {
            service_id: self.id.clone(),
            image: new.spec.container_image().map(str::to_string),
            version: new.version,
        });

        let mut service = self
            .inner
            .services
            .get_mut(&self.id)
            .ok_or_else(|| OrchestratorError::NotFound(self.id.to_string()))?;

        if let Some(error) = &service.update_failure {
            return Err(error.clone());
        }
        if service.version != new.version {
            return Err(OrchestratorError::VersionConflict(format!(
                "update out of sequence: current version {}, got {}",
                service.version, new.version
            )));
        }

        service.spec = new.spec;
        service.version = VersionToken(service.version.0 + 1);
        tracing::info!(
            service_id = %self.id,
            image = ?service.spec.container_image(),
            version = %service.version,
            "in-memory service updated"
        );

        Ok(UpdateReceipt::default())
    }
}
