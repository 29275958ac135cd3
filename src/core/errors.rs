use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum AsinCacheError {
    /// Blob store read/write/delete failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Product API answered with a body that lacks the expected shape
    #[error("Invalid upstream response for {0}: {1}")]
    UpstreamInvalidResponse(String, String),

    /// Product API could not be reached or returned a non-success status
    #[error("Upstream transport failure for {0}: {1}")]
    UpstreamTransportFailure(String, String),

    /// Item key has no resolvable record
    #[error("ASIN {0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required environment variable is absent
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration for `{0}`: {1}")]
    InvalidConfig(String, String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AsinCacheError {
    fn from(err: serde_json::Error) -> Self {
        AsinCacheError::SerializationError(err.to_string())
    }
}
