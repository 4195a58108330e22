//! Error types for credential handling.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while storing or exchanging credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The token endpoint returned an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Credential storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}
