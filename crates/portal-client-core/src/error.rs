#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("failed to read `{key}` from storage")]
    Read { key: String },
    #[error("failed to write `{key}` to storage")]
    Write { key: String },
    #[error("failed to remove `{key}` from storage")]
    Remove { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("failed to build request: {0}")]
    Request(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("api base url must not be empty")]
    EmptyBaseUrl,
    #[error("api base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("request timeout of {timeout_ms} ms is outside 1..=2147483647 ms")]
    InvalidTimeout { timeout_ms: u64 },
    #[error("failed to decode config: {0}")]
    Decode(String),
}

/// Reasons the current-user profile could not be resolved. Every variant is
/// handled the same way: forced logout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("no session token is stored")]
    MissingToken,
    #[error("profile request rejected with status {status}")]
    Rejected { status: u16 },
    #[error(transparent)]
    Transport(#[from] ApiError),
    #[error("profile response is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DomError {
    pub message: String,
}

impl DomError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
