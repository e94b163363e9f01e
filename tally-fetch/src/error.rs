//! Fetch error types.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// API Error
// ============================================================================

/// Error type for backend requests.
///
/// Only [`ApiError::Unauthorized`] is ever handled inside the client (by a
/// single token refresh); every other kind reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response: connection refused, DNS, TLS or timeout.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 401.
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("authentication required"))]
    Unauthorized {
        /// Server-supplied message.
        message: Option<String>,
    },

    /// Any other 4xx.
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("validation failed"))]
    Validation {
        /// HTTP status.
        status: StatusCode,
        /// Server-supplied message.
        message: Option<String>,
        /// Parsed JSON body, e.g. field errors.
        payload: Option<Value>,
    },

    /// 5xx.
    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("internal error"))]
    Server {
        /// HTTP status.
        status: StatusCode,
        /// Server-supplied message.
        message: Option<String>,
    },

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Base URL or path could not be joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Rejected before any request was sent.
    #[error("{0}")]
    InvalidInput(String),

    /// A 401 could not be recovered because no refresh token is stored.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Durable credential storage failed.
    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),
}

impl ApiError {
    /// Builds the error for a non-success status.
    pub fn from_status(status: StatusCode, message: Option<String>, payload: Option<Value>) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized { message }
        } else if status.is_client_error() {
            Self::Validation {
                status,
                message,
                payload,
            }
        } else {
            Self::Server { status, message }
        }
    }

    /// The message the server put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Validation { message, .. }
            | Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The parsed error body of a validation failure.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Validation { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns true for HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

// ============================================================================
// Credential Error
// ============================================================================

/// Error type for durable credential storage.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Keychain access failed.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Stored data could not be parsed.
    #[error("Corrupt credential data: {0}")]
    Corrupt(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(e) => {
                CredentialError::Keychain(format!("Access denied: {e}"))
            }
            keyring::Error::PlatformFailure(e) => CredentialError::Keychain(e.to_string()),
            keyring::Error::BadEncoding(_) => {
                CredentialError::Corrupt("Keychain entry is not valid UTF-8".to_string())
            }
            _ => CredentialError::Keychain(err.to_string()),
        }
    }
}
