use thiserror::Error;

/// Errors returned by the container orchestrator collaborator.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    #[error("service '{0}' not found")]
    NotFound(String),

    #[error("version conflict: {0}")]
    VersionConflict(String),

    #[error("orchestrator returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("orchestrator call timed out after {0} ms")]
    Timeout(u64),

    #[error("malformed orchestrator response: {0}")]
    InvalidResponse(String),

    #[error("invalid service spec: {0}")]
    Spec(#[from] SpecError),
}

/// Errors raised while rewriting a service spec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("service spec is not a JSON object")]
    NotAnObject,

    #[error("field '{0}' is present but not a JSON object")]
    FieldNotAnObject(&'static str),
}

/// Errors from webhook signature verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("signature does not match payload")]
    Mismatch,

    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),
}

/// Startup configuration errors. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET not set")]
    MissingSecret,

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
