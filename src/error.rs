//! Error types for the DWS deployment client.
//!
//! This module provides the error hierarchy for every stage of a command:
//! configuration, the signed API transport, and the provisioning poll.

use thiserror::Error;

/// The main error type for the deployment client.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider API errors.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Provisioning errors.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be loaded.
    #[error("Failed to load configuration: {message}")]
    LoadError {
        /// Description of the load error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The API base URL is not a valid absolute URL.
    #[error("Invalid API URL '{url}': {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// Errors raised by the signed API transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Transport error calling {endpoint}: {source}")]
    Transport {
        /// Method and URL of the failed call.
        endpoint: String,
        /// Underlying cause.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status in the 400-599 range.
    #[error("Request failed, status code: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnosis.
        body: String,
    },

    /// The server answered successfully but the body could not be decoded.
    #[error("Failed to decode response body: {message} (body: {body})")]
    Decode {
        /// Decoder message.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// The request could not be signed.
    #[error("Failed to sign request: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {message}")]
    Encode {
        /// Encoder message.
        message: String,
    },

    /// The call was aborted by the cancellation token.
    #[error("Request to {endpoint} was cancelled")]
    Cancelled {
        /// Method and URL of the aborted call.
        endpoint: String,
    },
}

/// Errors raised while waiting for a resource to become usable.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The server reported a terminal failure status.
    #[error("Resource {id} reached terminal status '{status}'")]
    Failed {
        /// Resource identifier.
        id: String,
        /// Reported status.
        status: String,
    },

    /// The poll budget was exhausted.
    #[error("Timeout waiting for resource {id} to start after {attempts} checks")]
    Timeout {
        /// Resource identifier.
        id: String,
        /// Number of status checks performed.
        attempts: u32,
    },

    /// The poll was interrupted by the cancellation token.
    #[error("Provisioning of resource {id} was cancelled")]
    Cancelled {
        /// Resource identifier.
        id: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the poll loop may swallow this error and try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Transport { .. } | ApiError::Decode { .. } | ApiError::Status { .. })
        )
    }

    /// Returns true if this error was caused by cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Cancelled { .. }) | Self::Provision(ProvisionError::Cancelled { .. })
        )
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(ApiError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ApiError {
    /// Creates a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}
