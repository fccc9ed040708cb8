//! Service-side domain types.
//!
//! `ServiceId` and `ImageReference` are opaque string tokens compared
//! byte-for-byte. `ServiceSpec` wraps the orchestrator's JSON spec document
//! so that everything other than the container image passes through
//! untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SpecError;

/// Identifier of a manageable unit (Swarm service name or ID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` is usable as a Swarm service name or ID:
    /// `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Exact package/image URL, e.g. `ghcr.io/acme/api:latest`.
///
/// No normalisation is applied: `img:1` and `IMG:1` are different references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Optimistic-concurrency fence supplied by the orchestrator (`Version.Index`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub u64);

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A service specification as returned by the orchestrator.
///
/// Follows the Swarm layout: the image lives at
/// `TaskTemplate.ContainerSpec.Image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceSpec(Value);

impl ServiceSpec {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The container image currently set in the spec, if any.
    pub fn container_image(&self) -> Option<&str> {
        self.0
            .pointer("/TaskTemplate/ContainerSpec/Image")
            .and_then(Value::as_str)
    }

    /// Return a copy of this spec with only the container image replaced.
    ///
    /// Missing `TaskTemplate` / `ContainerSpec` objects are created; every
    /// other field is preserved as-is.
    pub fn with_container_image(&self, image: &ImageReference) -> Result<ServiceSpec, SpecError> {
        let mut value = self.0.clone();
        let root = value.as_object_mut().ok_or(SpecError::NotAnObject)?;
        let task_template = child_object(root, "TaskTemplate")?;
        let container_spec = child_object(task_template, "ContainerSpec")?;
        container_spec.insert("Image".to_string(), Value::String(image.as_str().to_string()));
        Ok(ServiceSpec(value))
    }
}

fn child_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &'static str,
) -> Result<&'a mut Map<String, Value>, SpecError> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(SpecError::FieldNotAnObject(key))
}

/// Result of inspecting a service: its current spec and version token.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSnapshot {
    pub spec: ServiceSpec,
    pub version: VersionToken,
}

/// A new spec fenced by the version token it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedSpec {
    pub spec: ServiceSpec,
    pub version: VersionToken,
}

/// Acknowledgement of a committed service update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReceipt {
    /// Warnings reported by the orchestrator (e.g. image digest not pinned).
    pub warnings: Vec<String>,
}
