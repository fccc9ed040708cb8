//! Configuration types for Deckhand.
//!
//! `FileConfig` is the optional `deckhand.toml` document; every field has a
//! default so a missing section is fine. `DeckhandConfig` is the resolved
//! configuration after layering file, environment and CLI overrides.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default Docker Engine endpoint.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Default per-call orchestrator timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment prefix of service registry entries (`SER_<service_id>=<image>`).
pub const SERVICE_ENV_PREFIX: &str = "SER_";

/// Configuration table: service id -> tracked image reference.
pub type ServiceTable = BTreeMap<String, String>;

/// On-disk configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub docker: DockerSection,

    #[serde(default)]
    pub registry_auth: Option<RegistryAuthSection>,

    /// Service id -> image reference.
    #[serde(default)]
    pub services: ServiceTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerSection {
    /// `unix:///path`, `tcp://host:port` or `http(s)://host:port`.
    pub host: Option<String>,
    /// Engine API version prefix, e.g. `1.43`.
    pub api_version: Option<String>,
    pub timeout_secs: Option<u64>,
    pub update_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryAuthSection {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub server_address: Option<String>,
}

/// Resolved Docker Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    pub host: String,
    pub api_version: Option<String>,
    pub timeout_secs: u64,
    /// Maximum number of services updated at once (at least 1).
    pub update_concurrency: usize,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DOCKER_HOST.to_string(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            update_concurrency: 1,
        }
    }
}

/// Credentials forwarded to the orchestrator so it can pull private images.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub username: String,
    pub password: SecretString,
    pub server_address: Option<String>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct DeckhandConfig {
    /// Shared webhook secret. Never logged.
    pub secret: SecretString,
    pub host: String,
    pub port: u16,
    pub docker: DockerConfig,
    pub registry_auth: Option<RegistryAuth>,
    pub services: ServiceTable,
}
