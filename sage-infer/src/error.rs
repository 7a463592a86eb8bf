//! Error types for inference and embedding providers

use std::time::Duration;

/// Result type for provider operations.
///
/// This is a convenience type alias that uses [`InferError`] as the error type.
pub type Result<T> = std::result::Result<T, InferError>;

/// Error type for all text-completion and embedding calls.
///
/// Each variant maps to one way an external model service can let a caller down.
/// Only [`InferError::Unavailable`] is considered transient: providers retry it
/// according to their configuration, and every other variant is returned at once.
///
/// # Error Categories
///
/// - **Transport**: The service could not be reached or answered with a server error
/// - **Deadline**: The call exceeded the configured timeout
/// - **Protocol**: The service answered, but not with something usable
/// - **Configuration**: The provider was set up with unusable parameters
#[derive(Debug, thiserror::Error)]
pub enum InferError {
    /// The service is unreachable, refused the connection, or returned 5xx/429
    #[error("Inference service unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The call did not complete within the configured timeout
    #[error("Inference call timed out after {after:?}")]
    Timeout { after: Duration },

    /// The service answered with an unexpected status or an unparseable body
    #[error("Invalid response from inference service: {message}")]
    InvalidResponse { message: String },

    /// Provider configuration is invalid
    #[error("Invalid provider configuration: {message}")]
    InvalidConfig { message: String },
}

impl InferError {
    /// Create an unavailability error from a transport failure.
    ///
    /// # Arguments
    /// * `message` - What was being attempted
    /// * `source` - The underlying error
    pub fn unavailable<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unavailability error that has no underlying error, e.g. an HTTP 503.
    pub fn unavailable_status<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid response error with a custom message.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    ///
    /// Used for configuration validation errors such as an empty model name,
    /// a base URL that does not parse, or a zero timeout.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
