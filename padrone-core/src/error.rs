//! Error types for master server calls.
//!
//! Status codes are never errors: a call that reaches the server always
//! yields a status. The variants here cover everything that stops a call
//! from producing one, plus body encoding problems.

use crate::protocol::HttpMethod;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A bounded resource (transport pool, header buffer) ran out.
    Resource,
    /// A payload could not be encoded or decoded.
    Protocol,
    /// The server did not answer in time.
    Timeout,
    /// The client was configured incorrectly.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Resource => write!(f, "resource"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Configuration => write!(f, "configuration"),
        }
    }
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no {method} transport available (pool capacity {capacity})")]
    PoolExhausted { method: HttpMethod, capacity: usize },

    #[error("header buffer full, cannot add `{name}` (capacity {capacity})")]
    HeaderCapacity { name: String, capacity: usize },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// The category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::PoolExhausted { .. } | ClientError::HeaderCapacity { .. } => {
                ErrorCategory::Resource
            }
            ClientError::Encode(_) | ClientError::Decode(_) => {
                ErrorCategory::Protocol
            }
            ClientError::Timeout { .. } => ErrorCategory::Timeout,
            ClientError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ClientError::Config(message.into())
    }
}

/// Result type using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;
