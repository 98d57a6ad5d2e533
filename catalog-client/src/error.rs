//! Client error types

use thiserror::Error;

/// Client error type
///
/// Cloneable so that one in-flight read can hand the same failure to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status code, when the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request reached the service and got an answer
    pub fn is_server_response(&self) -> bool {
        matches!(self, ClientError::Status { .. } | ClientError::InvalidResponse(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
