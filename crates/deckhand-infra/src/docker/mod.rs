//! DockerOrchestrator -- concrete [`Orchestrator`] implementation for Docker
//! Swarm services.
//!
//! Talks to the Docker Engine API:
//! - `GET /services/{id}` -- current spec and `Version.Index`
//! - `POST /services/{id}/update?version={index}` -- submit the new spec
//! - `GET /info` -- startup probe
//!
//! Registry credentials, when configured, are sent as `X-Registry-Auth` on
//! updates so the swarm can pull private images. The password is held as a
//! [`SecretString`] until the header is built.

pub mod transport;
pub mod types;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use secrecy::ExposeSecret;

use deckhand_core::orchestrator::{Orchestrator, ServiceHandle};
use deckhand_types::config::{DockerConfig, RegistryAuth};
use deckhand_types::error::OrchestratorError;
use deckhand_types::service::{
    ServiceId, ServiceSnapshot, ServiceSpec, UpdateReceipt, VersionToken, VersionedSpec,
};

use self::transport::{DockerHost, EngineRequest, EngineResponse, Method, Transport};
use self::types::{AuthConfig, ErrorResponse, ServiceInspect, ServiceUpdateResponse, SystemInfo};

/// Header carrying base64url-encoded registry credentials.
const REGISTRY_AUTH_HEADER: &str = "x-registry-auth";

/// Engine error text for a stale `version` on service update.
const OUT_OF_SEQUENCE: &str = "out of sequence";

#[derive(Debug)]
struct DockerClient {
    transport: Transport,
    /// `""` or `/v1.43`.
    path_prefix: String,
    registry_auth: Option<String>,
}

/// Docker Swarm orchestrator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DockerOrchestrator {
    client: Arc<DockerClient>,
}

impl DockerOrchestrator {
    /// Create a client for the configured engine endpoint.
    pub fn new(
        config: &DockerConfig,
        registry_auth: Option<&RegistryAuth>,
    ) -> Result<Self, OrchestratorError> {
        let host = DockerHost::parse(&config.host).map_err(OrchestratorError::Transport)?;
        let transport = Transport::new(host)?;
        let path_prefix = config
            .api_version
            .as_deref()
            .map(|v| format!("/v{}", v.trim_start_matches('v')))
            .unwrap_or_default();
        let registry_auth = registry_auth.map(encode_registry_auth).transpose()?;

        Ok(Self {
            client: Arc::new(DockerClient {
                transport,
                path_prefix,
                registry_auth,
            }),
        })
    }

    /// `GET /info`, used to log which daemon we are connected to.
    pub async fn info(&self) -> Result<SystemInfo, OrchestratorError> {
        let response = self.client.get("/info").await?;
        let response = check_status(response, "info")?;
        decode(&response)
    }
}

impl DockerClient {
    async fn get(&self, path: &str) -> Result<EngineResponse, OrchestratorError> {
        self.transport
            .send(EngineRequest {
                method: Method::Get,
                path: format!("{}{path}", self.path_prefix),
                headers: Vec::new(),
                body: None,
            })
            .await
    }

    async fn inspect_service(&self, id: &ServiceId) -> Result<ServiceSnapshot, OrchestratorError> {
        let response = self.get(&format!("/services/{id}")).await?;
        let response = check_status(response, id.as_str())?;
        let inspect: ServiceInspect = decode(&response)?;

        tracing::debug!(
            service_id = %id,
            docker_id = ?inspect.id,
            version = inspect.version.index,
            "inspected service"
        );

        Ok(ServiceSnapshot {
            spec: ServiceSpec::new(inspect.spec),
            version: VersionToken(inspect.version.index),
        })
    }

    async fn update_service(
        &self,
        id: &ServiceId,
        update: VersionedSpec,
    ) -> Result<UpdateReceipt, OrchestratorError> {
        let body = serde_json::to_vec(update.spec.as_value())
            .map_err(|e| OrchestratorError::InvalidResponse(e.to_string()))?;
        let mut headers = Vec::new();
        if let Some(auth) = &self.registry_auth {
            headers.push((REGISTRY_AUTH_HEADER, auth.clone()));
        }

        let response = self
            .transport
            .send(EngineRequest {
                method: Method::Post,
                path: format!(
                    "{}/services/{id}/update?version={}",
                    self.path_prefix, update.version
                ),
                headers,
                body: Some(body),
            })
            .await?;
        let response = check_status(response, id.as_str())?;

        let parsed: ServiceUpdateResponse = if response.body.is_empty() {
            ServiceUpdateResponse::default()
        } else {
            decode(&response)?
        };
        Ok(UpdateReceipt {
            warnings: parsed.warnings.unwrap_or_default(),
        })
    }
}

impl Orchestrator for DockerOrchestrator {
    type Handle = DockerServiceHandle;

    fn get_service(&self, id: &ServiceId) -> DockerServiceHandle {
        DockerServiceHandle {
            id: id.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

/// Handle to one Swarm service.
#[derive(Debug, Clone)]
pub struct DockerServiceHandle {
    id: ServiceId,
    client: Arc<DockerClient>,
}

impl ServiceHandle for DockerServiceHandle {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    async fn inspect(&self) -> Result<ServiceSnapshot, OrchestratorError> {
        self.client.inspect_service(&self.id).await
    }

    async fn update(&self, spec: VersionedSpec) -> Result<UpdateReceipt, OrchestratorError> {
        self.client.update_service(&self.id, spec).await
    }
}

/// Map non-2xx engine responses onto [`OrchestratorError`].
fn check_status(response: EngineResponse, subject: &str) -> Result<EngineResponse, OrchestratorError> {
    if response.is_success() {
        return Ok(response);
    }

    let message = serde_json::from_slice::<ErrorResponse>(&response.body)
        .map(|e| e.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).trim().to_string());

    Err(match response.status {
        404 => OrchestratorError::NotFound(subject.to_string()),
        _ if message.contains(OUT_OF_SEQUENCE) => OrchestratorError::VersionConflict(message),
        status => OrchestratorError::Api { status, message },
    })
}

fn decode<T: serde::de::DeserializeOwned>(response: &EngineResponse) -> Result<T, OrchestratorError> {
    serde_json::from_slice(&response.body)
        .map_err(|e| OrchestratorError::InvalidResponse(e.to_string()))
}

fn encode_registry_auth(auth: &RegistryAuth) -> Result<String, OrchestratorError> {
    let json = serde_json::to_vec(&AuthConfig {
        username: &auth.username,
        password: auth.password.expose_secret(),
        server_address: auth.server_address.as_deref(),
    })
    .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
    Ok(URL_SAFE.encode(json))
}
