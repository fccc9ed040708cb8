//! Webhook processor.
//!
//! Runs an inbound publish event through a fixed sequence of gates:
//!
//! 1. action filter (`published` only)
//! 2. payload completeness (non-empty package URL)
//! 3. signature verification over the raw body
//! 4. registry resolution (all matching services)
//! 5. update fan-out (inspect, then update with the inspected version token)
//!
//! The first failing gate decides the [`WebhookOutcome`]. During fan-out the
//! first failed service stops the remaining ones; updates that already went
//! through are not rolled back.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use deckhand_types::config::DEFAULT_TIMEOUT_SECS;
use deckhand_types::error::OrchestratorError;
use deckhand_types::event::{PUBLISHED_ACTION, PublishEvent};
use deckhand_types::outcome::{ServiceUpdateOutcome, WebhookOutcome};
use deckhand_types::service::{ImageReference, ServiceId, UpdateReceipt, VersionedSpec};

use crate::orchestrator::{Orchestrator, ServiceHandle};
use crate::registry::ServiceRegistry;

use super::verifier::SignatureVerifier;

/// Tuning knobs for the update fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Upper bound on each orchestrator call.
    pub call_timeout: Duration,
    /// Maximum number of services updated at once. `1` means strictly
    /// sequential in ascending service-id order.
    pub update_concurrency: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            update_concurrency: 1,
        }
    }
}

/// Validates publish events and rolls matching services to the new image.
pub struct WebhookProcessor<O, V> {
    registry: Arc<ServiceRegistry>,
    orchestrator: O,
    verifier: V,
    options: ProcessorOptions,
}

impl<O, V> WebhookProcessor<O, V>
where
    O: Orchestrator,
    V: SignatureVerifier,
{
    pub fn new(
        registry: Arc<ServiceRegistry>,
        orchestrator: O,
        verifier: V,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            verifier,
            options,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    /// Extract the event from a raw JSON body, then run it through the gates.
    pub async fn handle_payload(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> WebhookOutcome {
        let event = PublishEvent::from_json_bytes(raw_body);
        self.handle(
            raw_body,
            event.action.as_deref().unwrap_or_default(),
            event.package_url.as_deref(),
            signature_header,
        )
        .await
    }

    /// Run one event through the gate sequence.
    pub async fn handle(
        &self,
        raw_body: &[u8],
        action: &str,
        package_url: Option<&str>,
        signature_header: Option<&str>,
    ) -> WebhookOutcome {
        if action != PUBLISHED_ACTION {
            tracing::debug!(action, "ignoring webhook with non-publish action");
            return WebhookOutcome::IgnoringInvalidAction;
        }

        let Some(package_url) = package_url.filter(|url| !url.is_empty()) else {
            tracing::warn!("publish webhook without package_url");
            return WebhookOutcome::MissingPackageUrl;
        };

        if let Err(error) = self.verifier.verify(raw_body, signature_header) {
            tracing::warn!(%error, package_url, "rejected webhook signature");
            return WebhookOutcome::InvalidSignature;
        }

        let image = ImageReference::new(package_url);
        let services = self.registry.lookup_all(&image);
        if services.is_empty() {
            tracing::warn!(package_url, "no service tracks this package");
            return WebhookOutcome::NoServiceFound;
        }

        tracing::info!(
            package_url,
            services = services.len(),
            "received valid webhook, updating services"
        );

        let outcomes = self.update_all(&services, &image).await;
        let updated = outcomes.iter().filter(|o| o.is_success()).count();
        if updated == services.len() {
            WebhookOutcome::Ok
        } else {
            tracing::warn!(
                package_url,
                matched = services.len(),
                updated,
                "ERROR_UPDATING_SERVICE"
            );
            WebhookOutcome::ErrorUpdatingService
        }
    }

    /// Update every service, stopping at the first failure.
    ///
    /// At most `update_concurrency` updates are in flight; once one fails no
    /// further update is started, but in-flight ones run to completion.
    /// Returns the outcome of each service that was attempted.
    async fn update_all(
        &self,
        services: &BTreeSet<ServiceId>,
        image: &ImageReference,
    ) -> Vec<ServiceUpdateOutcome> {
        let limit = self.options.update_concurrency.max(1);
        let mut pending = services.iter();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes = Vec::with_capacity(services.len());
        let mut failed = false;

        loop {
            while !failed && in_flight.len() < limit {
                let Some(service_id) = pending.next() else {
                    break;
                };
                in_flight.push(self.update_one(service_id, image));
            }

            let Some(outcome) = in_flight.next().await else {
                break;
            };
            failed |= !outcome.is_success();
            outcomes.push(outcome);
        }

        let skipped = services.len() - outcomes.len();
        if skipped > 0 {
            tracing::debug!(skipped, "skipped updates after earlier failure");
        }
        outcomes
    }

    async fn update_one(
        &self,
        service_id: &ServiceId,
        image: &ImageReference,
    ) -> ServiceUpdateOutcome {
        let result = self.update_service(service_id, image).await;
        match &result {
            Ok(receipt) => {
                for warning in &receipt.warnings {
                    tracing::warn!(%service_id, %warning, "orchestrator warning");
                }
                tracing::info!(%service_id, %image, "service updated");
            }
            Err(error) => {
                tracing::error!(%service_id, %image, %error, "service update failed");
            }
        }
        ServiceUpdateOutcome {
            service_id: service_id.clone(),
            result,
        }
    }

    /// Inspect, then update with the image swapped and the same version token.
    async fn update_service(
        &self,
        service_id: &ServiceId,
        image: &ImageReference,
    ) -> Result<UpdateReceipt, OrchestratorError> {
        let handle = self.orchestrator.get_service(service_id);

        let snapshot = self.bounded(handle.inspect()).await?;
        let spec = snapshot.spec.with_container_image(image)?;
        tracing::debug!(
            service_id = %handle.id(),
            previous_image = ?snapshot.spec.container_image(),
            version = %snapshot.version,
            "submitting service update"
        );

        self.bounded(handle.update(VersionedSpec {
            spec,
            version: snapshot.version,
        }))
        .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, OrchestratorError>>,
    ) -> Result<T, OrchestratorError> {
        match tokio::time::timeout(self.options.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout(
                u64::try_from(self.options.call_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use deckhand_types::config::ServiceTable;
    use deckhand_types::error::SignatureError;
    use deckhand_types::service::{ServiceSnapshot, ServiceSpec, VersionToken};
    use serde_json::json;

    use crate::orchestrator::memory::{InMemoryOrchestrator, OrchestratorCall};

    const GOOD_SIG: &str = "sha256=good";

    /// Accepts exactly one header value, regardless of body.
    struct FixedVerifier;

    impl SignatureVerifier for FixedVerifier {
        fn verify(&self, _body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
            match header {
                None => Err(SignatureError::Missing),
                Some(GOOD_SIG) => Ok(()),
                Some(_) => Err(SignatureError::Mismatch),
            }
        }
    }

    fn registry(pairs: &[(&str, &str)]) -> Arc<ServiceRegistry> {
        let table: ServiceTable = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(ServiceRegistry::new(&table))
    }

    fn spec(name: &str, image: &str) -> ServiceSpec {
        ServiceSpec::new(json!({
            "Name": name,
            "TaskTemplate": { "ContainerSpec": { "Image": image, "Env": ["A=1"] } },
            "Mode": { "Replicated": { "Replicas": 2 } }
        }))
    }

    fn processor(
        pairs: &[(&str, &str)],
        orchestrator: InMemoryOrchestrator,
    ) -> WebhookProcessor<InMemoryOrchestrator, FixedVerifier> {
        WebhookProcessor::new(
            registry(pairs),
            orchestrator,
            FixedVerifier,
            ProcessorOptions::default(),
        )
    }

    fn body(action: &str, url: &str) -> Vec<u8> {
        json!({ "action": action, "package": { "package_version": { "package_url": url } } })
            .to_string()
            .into_bytes()
    }

    #[tokio::test]
    async fn test_non_published_action_is_ignored() {
        let orchestrator = InMemoryOrchestrator::new();
        let p = processor(&[("A", "img:1")], orchestrator.clone());

        for action in ["updated", "", "PUBLISHED", "published "] {
            let outcome = p
                .handle(b"{}", action, Some("img:1"), Some(GOOD_SIG))
                .await;
            assert_eq!(outcome, WebhookOutcome::IgnoringInvalidAction);
        }
        // Checked before anything else: even a bad signature yields the action token
        let outcome = p.handle(b"{}", "deleted", None, None).await;
        assert_eq!(outcome, WebhookOutcome::IgnoringInvalidAction);
        assert!(orchestrator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_empty_package_url() {
        let p = processor(&[("A", "img:1")], InMemoryOrchestrator::new());

        let outcome = p.handle(b"{}", "published", None, Some(GOOD_SIG)).await;
        assert_eq!(outcome, WebhookOutcome::MissingPackageUrl);

        let outcome = p.handle(b"{}", "published", Some(""), None).await;
        assert_eq!(outcome, WebhookOutcome::MissingPackageUrl);
    }

    #[tokio::test]
    async fn test_bad_or_missing_signature() {
        let orchestrator = InMemoryOrchestrator::new();
        let p = processor(&[("A", "img:1")], orchestrator.clone());

        let outcome = p.handle(b"{}", "published", Some("img:1"), None).await;
        assert_eq!(outcome, WebhookOutcome::InvalidSignature);

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some("sha256=bad"))
            .await;
        assert_eq!(outcome, WebhookOutcome::InvalidSignature);
        assert!(orchestrator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_service_makes_no_calls() {
        let orchestrator = InMemoryOrchestrator::new();
        let p = processor(&[("A", "img:1"), ("B", "img:2")], orchestrator.clone());

        let outcome = p
            .handle(b"{}", "published", Some("img:9"), Some(GOOD_SIG))
            .await;

        assert_eq!(outcome, WebhookOutcome::NoServiceFound);
        assert!(orchestrator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_only_matching_service_is_updated() {
        let orchestrator = InMemoryOrchestrator::new();
        let a = ServiceId::from("A");
        let b = ServiceId::from("B");
        orchestrator.insert_service(&a, spec("A", "img:0"));
        orchestrator.insert_service(&b, spec("B", "img:2"));
        let p = processor(&[("A", "img:1"), ("B", "img:2")], orchestrator.clone());

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;

        assert_eq!(outcome, WebhookOutcome::Ok);
        assert_eq!(
            orchestrator.calls(),
            vec![
                OrchestratorCall::Inspect(a.clone()),
                OrchestratorCall::Update {
                    service_id: a.clone(),
                    image: Some("img:1".to_string()),
                    version: VersionToken(1),
                },
            ]
        );
        let b_after = orchestrator.snapshot(&b).unwrap();
        assert_eq!(b_after.version, VersionToken(1));
        assert_eq!(b_after.spec.container_image(), Some("img:2"));
    }

    #[tokio::test]
    async fn test_update_preserves_rest_of_spec() {
        let orchestrator = InMemoryOrchestrator::new();
        let a = ServiceId::from("A");
        orchestrator.insert_service(&a, spec("A", "img:0"));
        let p = processor(&[("A", "img:1")], orchestrator.clone());

        p.handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;

        let ServiceSnapshot { spec: after, version } = orchestrator.snapshot(&a).unwrap();
        assert_eq!(version, VersionToken(2));
        assert_eq!(after.as_value(), spec("A", "img:1").as_value());
    }

    #[tokio::test]
    async fn test_second_failure_keeps_first_update() {
        let orchestrator = InMemoryOrchestrator::new();
        let first = ServiceId::from("a-first");
        let second = ServiceId::from("b-second");
        let third = ServiceId::from("c-third");
        orchestrator.insert_service(&first, spec("a-first", "img:0"));
        orchestrator.insert_service(&second, spec("b-second", "img:0"));
        orchestrator.insert_service(&third, spec("c-third", "img:0"));
        orchestrator.fail_updates(
            &second,
            OrchestratorError::Api {
                status: 500,
                message: "rpc error".to_string(),
            },
        );
        let p = processor(
            &[("a-first", "img:1"), ("b-second", "img:1"), ("c-third", "img:1")],
            orchestrator.clone(),
        );

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;

        assert_eq!(outcome, WebhookOutcome::ErrorUpdatingService);
        assert_eq!(outcome.status_code(), 500);
        // First committed, no rollback
        assert_eq!(
            orchestrator.snapshot(&first).unwrap().spec.container_image(),
            Some("img:1")
        );
        assert_eq!(
            orchestrator.snapshot(&second).unwrap().spec.container_image(),
            Some("img:0")
        );
        // Third never attempted
        assert!(!orchestrator.calls().iter().any(|call| matches!(
            call,
            OrchestratorCall::Inspect(id) if *id == third
        )));
        assert_eq!(
            orchestrator.snapshot(&third).unwrap().spec.container_image(),
            Some("img:0")
        );
    }

    #[tokio::test]
    async fn test_missing_service_is_update_error() {
        let p = processor(&[("ghost", "img:1")], InMemoryOrchestrator::new());

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;
        assert_eq!(outcome, WebhookOutcome::ErrorUpdatingService);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent_state_wise() {
        let orchestrator = InMemoryOrchestrator::new();
        let a = ServiceId::from("A");
        orchestrator.insert_service(&a, spec("A", "img:0"));
        let p = processor(&[("A", "img:1")], orchestrator.clone());

        for _ in 0..2 {
            let outcome = p
                .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
                .await;
            assert_eq!(outcome, WebhookOutcome::Ok);
        }

        let after = orchestrator.snapshot(&a).unwrap();
        assert_eq!(after.spec.as_value(), spec("A", "img:1").as_value());
        // Each delivery still consumes a version
        assert_eq!(after.version, VersionToken(3));
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_updates_all() {
        let orchestrator = InMemoryOrchestrator::new();
        let ids = ["s1", "s2", "s3", "s4"];
        for id in ids {
            orchestrator.insert_service(&ServiceId::from(id), spec(id, "img:0"));
        }
        let pairs: Vec<(&str, &str)> = ids.iter().map(|id| (*id, "img:1")).collect();
        let p = WebhookProcessor::new(
            registry(&pairs),
            orchestrator.clone(),
            FixedVerifier,
            ProcessorOptions {
                update_concurrency: 3,
                ..ProcessorOptions::default()
            },
        );

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;

        assert_eq!(outcome, WebhookOutcome::Ok);
        for id in ids {
            let snapshot = orchestrator.snapshot(&ServiceId::from(id)).unwrap();
            assert_eq!(snapshot.spec.container_image(), Some("img:1"));
        }
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_starts_nothing_after_failure() {
        let orchestrator = InMemoryOrchestrator::new();
        let ids = ["s1", "s2", "s3", "s4", "s5"];
        for id in ids {
            orchestrator.insert_service(&ServiceId::from(id), spec(id, "img:0"));
        }
        orchestrator.fail_updates(
            &ServiceId::from("s1"),
            OrchestratorError::Api {
                status: 500,
                message: "rpc error".to_string(),
            },
        );
        let pairs: Vec<(&str, &str)> = ids.iter().map(|id| (*id, "img:1")).collect();
        let p = WebhookProcessor::new(
            registry(&pairs),
            orchestrator.clone(),
            FixedVerifier,
            ProcessorOptions {
                update_concurrency: 2,
                ..ProcessorOptions::default()
            },
        );

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;

        assert_eq!(outcome, WebhookOutcome::ErrorUpdatingService);
        let inspected: BTreeSet<ServiceId> = orchestrator
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                OrchestratorCall::Inspect(id) => Some(id),
                OrchestratorCall::Update { .. } => None,
            })
            .collect();
        assert_eq!(
            inspected,
            BTreeSet::from([ServiceId::from("s1"), ServiceId::from("s2")])
        );
        for id in ["s3", "s4", "s5"] {
            let snapshot = orchestrator.snapshot(&ServiceId::from(id)).unwrap();
            assert_eq!(snapshot.version, VersionToken(1));
            assert_eq!(snapshot.spec.container_image(), Some("img:0"));
        }
    }

    #[tokio::test]
    async fn test_handle_payload_parses_raw_body() {
        let orchestrator = InMemoryOrchestrator::new();
        let a = ServiceId::from("A");
        orchestrator.insert_service(&a, spec("A", "img:0"));
        let p = processor(&[("A", "img:1")], orchestrator.clone());

        let outcome = p
            .handle_payload(&body("published", "img:1"), Some(GOOD_SIG))
            .await;
        assert_eq!(outcome, WebhookOutcome::Ok);

        let outcome = p
            .handle_payload(&body("published", ""), Some(GOOD_SIG))
            .await;
        assert_eq!(outcome, WebhookOutcome::MissingPackageUrl);

        let outcome = p.handle_payload(b"garbage", Some(GOOD_SIG)).await;
        assert_eq!(outcome, WebhookOutcome::IgnoringInvalidAction);
    }

    /// Orchestrator whose calls never complete in time.
    struct StalledOrchestrator;

    struct StalledHandle(ServiceId);

    impl Orchestrator for StalledOrchestrator {
        type Handle = StalledHandle;

        fn get_service(&self, id: &ServiceId) -> StalledHandle {
            StalledHandle(id.clone())
        }
    }

    impl ServiceHandle for StalledHandle {
        fn id(&self) -> &ServiceId {
            &self.0
        }

        async fn inspect(&self) -> Result<ServiceSnapshot, OrchestratorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(OrchestratorError::Transport("unreachable".into()))
        }

        async fn update(&self, _spec: VersionedSpec) -> Result<UpdateReceipt, OrchestratorError> {
            Ok(UpdateReceipt::default())
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_update_failure() {
        let p = WebhookProcessor::new(
            registry(&[("A", "img:1")]),
            StalledOrchestrator,
            FixedVerifier,
            ProcessorOptions {
                call_timeout: Duration::from_millis(20),
                update_concurrency: 1,
            },
        );

        let outcome = p
            .handle(b"{}", "published", Some("img:1"), Some(GOOD_SIG))
            .await;
        assert_eq!(outcome, WebhookOutcome::ErrorUpdatingService);

        let result = p
            .update_service(&ServiceId::from("A"), &ImageReference::from("img:1"))
            .await;
        assert!(matches!(result, Err(OrchestratorError::Timeout(20))));
    }
}
