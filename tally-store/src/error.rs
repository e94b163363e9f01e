//! Store error types.

use tally_core::CoreError;
use tally_fetch::{ApiError, CredentialError};
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend request failed.
    #[error("Request failed: {0}")]
    Api(#[from] ApiError),

    /// Credential storage failed.
    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),

    /// Invalid state transition or data.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the backend rejected the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Api(e) if e.is_unauthorized())
    }
}
