//! Inbound package-publish event.
//!
//! Extracted leniently from the raw webhook body: a body that is not JSON, or
//! whose fields have unexpected types, yields an event with absent fields
//! rather than a parse error. The processing gates decide what that means.

use serde_json::Value;

/// The only action value that triggers an update.
pub const PUBLISHED_ACTION: &str = "published";

/// Name of the header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// JSON pointer to the package URL inside the webhook payload.
const PACKAGE_URL_POINTER: &str = "/package/package_version/package_url";

/// Fields of a publish webhook that the processor acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishEvent {
    pub action: Option<String>,
    pub package_url: Option<String>,
}

impl PublishEvent {
    /// Extract the event fields from a raw JSON body.
    pub fn from_json_bytes(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            action: value
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string),
            package_url: value
                .pointer(PACKAGE_URL_POINTER)
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}
