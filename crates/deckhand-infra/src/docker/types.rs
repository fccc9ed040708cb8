//! Docker Engine API wire types (only the fields Deckhand reads).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /services/{id}` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInspect {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    pub version: ObjectVersion,
    pub spec: Value,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersion {
    pub index: u64,
}

/// `POST /services/{id}/update` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceUpdateResponse {
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// Error body returned by the engine on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// `GET /info` response, trimmed to what the startup probe logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default)]
    pub swarm: Option<SwarmInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwarmInfo {
    #[serde(rename = "LocalNodeState", default)]
    pub local_node_state: Option<String>,
    #[serde(rename = "ControlAvailable", default)]
    pub control_available: bool,
}

/// Payload of the `X-Registry-Auth` header (base64url-encoded JSON).
#[derive(Debug, Clone, Serialize)]
pub struct AuthConfig<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(rename = "serveraddress", skip_serializing_if = "Option::is_none")]
    pub server_address: Option<&'a str>,
}
