//! Core error types for Tally.

use thiserror::Error;

use crate::models::{UploadId, UploadStatus};

/// Core error type for Tally operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An upload record was asked to leave a terminal state.
    #[error("Upload {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record that rejected the transition.
        id: UploadId,
        /// Current status.
        from: UploadStatus,
        /// Requested status.
        to: UploadStatus,
    },

    /// Invalid data from an API response or local storage.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
