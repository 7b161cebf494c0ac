//! Client errors

use thiserror::Error;

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors for billing API and local storage operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection error - the billing API could not be reached.
    #[error("connection error: {message}")]
    Connection {
        /// Error message
        message: String,
        /// Whether the error is retryable
        retryable: bool,
    },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Authentication required or rejected.
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success response from the billing API.
    #[error("billing api returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// Response or snapshot could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local snapshot storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { retryable, .. } => *retryable,
            Self::Timeout => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Unauthenticated(_)
            | Self::NotFound(_)
            | Self::Serialization(_)
            | Self::Storage(_)
            | Self::Config(_) => false,
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>, retryable: bool) -> Self {
        Self::Connection {
            message: message.into(),
            retryable,
        }
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthenticated(message),
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Connection {
                message: err.to_string(),
                retryable: err.is_connect() || err.is_request(),
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
