//! Configuration loader for Deckhand.
//!
//! Layers, lowest to highest priority:
//! 1. built-in defaults
//! 2. optional TOML file (`--config` / `DECKHAND_CONFIG`)
//! 3. environment (`SECRET`, `PORT`, `DOCKER_HOST`, `SER_<service>=<image>`, ...)
//! 4. command-line overrides
//!
//! Any error here is fatal: the process does not start with a partial config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

use deckhand_core::registry::prefixed_entries;
use deckhand_types::config::{
    DEFAULT_HOST, DEFAULT_PORT, DeckhandConfig, DockerConfig, FileConfig, RegistryAuth,
    SERVICE_ENV_PREFIX,
};
use deckhand_types::error::ConfigError;
use deckhand_types::service::ServiceId;

use crate::docker::transport::DockerHost;

/// Environment variable names.
pub mod env {
    pub const SECRET: &str = "SECRET";
    pub const PORT: &str = "PORT";
    pub const HOST: &str = "HOST";
    pub const DOCKER_HOST: &str = "DOCKER_HOST";
    pub const DOCKER_API_VERSION: &str = "DOCKER_API_VERSION";
    pub const TIMEOUT_SECS: &str = "DECKHAND_TIMEOUT_SECS";
    pub const UPDATE_CONCURRENCY: &str = "DECKHAND_UPDATE_CONCURRENCY";
    pub const REGISTRY_USERNAME: &str = "REGISTRY_USERNAME";
    pub const REGISTRY_PASSWORD: &str = "REGISTRY_PASSWORD";
    pub const REGISTRY_SERVER: &str = "REGISTRY_SERVER";
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub docker_host: Option<String>,
}

/// Load configuration from the config file (if any), the process
/// environment and the command-line overrides.
pub async fn load_config(overrides: &ConfigOverrides) -> Result<DeckhandConfig, ConfigError> {
    let file = match &overrides.config_path {
        Some(path) => read_config_file(path).await?,
        None => FileConfig::default(),
    };

    // Non-UTF-8 variables can't be secrets or service entries; skip them.
    let vars: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();

    resolve_config(file, &vars, overrides)
}

/// Read and parse a TOML config file.
pub async fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

    toml::from_str::<FileConfig>(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Merge the layers into a resolved configuration.
pub fn resolve_config(
    file: FileConfig,
    vars: &BTreeMap<String, String>,
    overrides: &ConfigOverrides,
) -> Result<DeckhandConfig, ConfigError> {
    let var = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

    let secret = var(env::SECRET).ok_or(ConfigError::MissingSecret)?;

    let host = overrides
        .host
        .clone()
        .or_else(|| var(env::HOST))
        .or(file.server.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match (overrides.port, var(env::PORT)) {
        (Some(port), _) => port,
        (None, Some(raw)) => parse_value(env::PORT, &raw)?,
        (None, None) => file.server.port.unwrap_or(DEFAULT_PORT),
    };

    let defaults = DockerConfig::default();
    let docker_host = overrides
        .docker_host
        .clone()
        .or_else(|| var(env::DOCKER_HOST))
        .or(file.docker.host)
        .unwrap_or(defaults.host);
    DockerHost::parse(&docker_host).map_err(|message| ConfigError::InvalidValue {
        key: env::DOCKER_HOST.to_string(),
        message,
    })?;

    let timeout_secs = match var(env::TIMEOUT_SECS) {
        Some(raw) => parse_value(env::TIMEOUT_SECS, &raw)?,
        None => file.docker.timeout_secs.unwrap_or(defaults.timeout_secs),
    };
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "timeout_secs".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    let update_concurrency = match var(env::UPDATE_CONCURRENCY) {
        Some(raw) => parse_value(env::UPDATE_CONCURRENCY, &raw)?,
        None => file
            .docker
            .update_concurrency
            .unwrap_or(defaults.update_concurrency),
    };
    if update_concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            key: "update_concurrency".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    let docker = DockerConfig {
        host: docker_host,
        api_version: var(env::DOCKER_API_VERSION).or(file.docker.api_version),
        timeout_secs,
        update_concurrency,
    };

    let registry_auth = match (var(env::REGISTRY_USERNAME), var(env::REGISTRY_PASSWORD)) {
        (Some(username), Some(password)) => Some(RegistryAuth {
            username,
            password: SecretString::from(password),
            server_address: var(env::REGISTRY_SERVER),
        }),
        (None, None) => file.registry_auth.map(|section| RegistryAuth {
            username: section.username,
            password: SecretString::from(section.password),
            server_address: section.server_address,
        }),
        _ => {
            return Err(ConfigError::InvalidValue {
                key: env::REGISTRY_USERNAME.to_string(),
                message: format!(
                    "{} and {} must be set together",
                    env::REGISTRY_USERNAME,
                    env::REGISTRY_PASSWORD
                ),
            });
        }
    };

    // Environment entries win over file entries with the same service id.
    let mut services = file.services;
    services.extend(prefixed_entries(
        vars.iter().map(|(k, v)| (k.as_str(), v.clone())),
        SERVICE_ENV_PREFIX,
    ));
    // Ids end up in engine URL paths; empty ids are dropped by the registry.
    if let Some(bad) = services
        .keys()
        .find(|id| !id.is_empty() && !ServiceId::is_valid_name(id))
    {
        return Err(ConfigError::InvalidValue {
            key: format!("services.{bad}"),
            message: "service id must match [a-zA-Z0-9][a-zA-Z0-9_.-]*".to_string(),
        });
    }

    Ok(DeckhandConfig {
        secret: SecretString::from(secret),
        host,
        port,
        docker,
        registry_auth,
        services,
    })
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
