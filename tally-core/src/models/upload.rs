//! Upload record types.
//!
//! An [`UploadRecord`] tracks one submitted file through OCR and item
//! persistence. Records start in [`UploadStatus::Processing`] and move to
//! exactly one terminal status; a retry is a new record.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Generic OCR failure text when the service gives no message.
const OCR_FALLBACK_MESSAGE: &str = "Error processing receipt";

// ============================================================================
// Upload Id
// ============================================================================

/// Locally generated record id, unique within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub u64);

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// OCR or persistence still in flight.
    Processing,
    /// OCR succeeded and every item was saved.
    Processed,
    /// Some step failed; see [`FailureReason`].
    Failed,
}

impl UploadStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Processed => write!(f, "processed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why an upload failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// OCR request failed; carries the server message when there was one.
    Ocr(String),
    /// OCR succeeded but found no line items.
    NoItems,
    /// OCR succeeded but at least one item failed to save.
    PartialSave,
}

impl FailureReason {
    /// OCR failure with the server's message, or the generic text.
    pub fn ocr(message: Option<String>) -> Self {
        Self::Ocr(
            message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| OCR_FALLBACK_MESSAGE.to_string()),
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ocr(message) => write!(f, "{message}"),
            Self::NoItems => write!(f, "No items were found on the receipt to save."),
            Self::PartialSave => write!(f, "Processed receipt, but failed to save items."),
        }
    }
}

// ============================================================================
// Upload Record
// ============================================================================

/// Client-side record of one submitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Session-unique id.
    pub id: UploadId,
    /// Original file name.
    pub filename: String,
    /// Current lifecycle state.
    pub status: UploadStatus,
    /// Local date the file was submitted.
    pub submitted_on: NaiveDate,
    /// Resolved total (`$19.98`), absent until known.
    pub amount: Option<String>,
    /// Failure reason for failed records.
    pub failure: Option<FailureReason>,
    /// Size of the submitted file.
    pub size_bytes: u64,
}

impl UploadRecord {
    /// Creates a record in the processing state, dated today.
    pub fn new(id: UploadId, filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id,
            filename: filename.into(),
            status: UploadStatus::Processing,
            submitted_on: Local::now().date_naive(),
            amount: None,
            failure: None,
            size_bytes,
        }
    }

    fn ensure_processing(&self, to: UploadStatus) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    /// Moves to [`UploadStatus::Processed`] with the resolved amount.
    pub fn mark_processed(&mut self, amount: Option<String>) -> Result<(), CoreError> {
        self.ensure_processing(UploadStatus::Processed)?;
        self.status = UploadStatus::Processed;
        self.amount = amount;
        Ok(())
    }

    /// Moves to [`UploadStatus::Failed`] with a reason.
    pub fn mark_failed(&mut self, reason: FailureReason) -> Result<(), CoreError> {
        self.ensure_processing(UploadStatus::Failed)?;
        self.status = UploadStatus::Failed;
        self.failure = Some(reason);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_processing() {
        let record = UploadRecord::new(UploadId(1), "a.jpg", 10);
        assert_eq!(record.status, UploadStatus::Processing);
        assert!(record.amount.is_none());
        assert!(record.failure.is_none());
    }

    #[test]
    fn test_processed_transition() {
        let mut record = UploadRecord::new(UploadId(1), "a.jpg", 10);
        record.mark_processed(Some("$4.00".to_string())).unwrap();
        assert_eq!(record.status, UploadStatus::Processed);
        assert_eq!(record.amount.as_deref(), Some("$4.00"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut record = UploadRecord::new(UploadId(2), "b.png", 10);
        record.mark_failed(FailureReason::NoItems).unwrap();

        let err = record.mark_processed(None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert!(record.mark_failed(FailureReason::PartialSave).is_err());
        assert_eq!(record.failure, Some(FailureReason::NoItems));
    }

    #[test]
    fn test_ocr_reason_fallback() {
        assert_eq!(
            FailureReason::ocr(None).to_string(),
            "Error processing receipt"
        );
        assert_eq!(
            FailureReason::ocr(Some("Image too large".to_string())).to_string(),
            "Image too large"
        );
    }

    #[test]
    fn test_upload_id_display() {
        assert_eq!(UploadId(42).to_string(), "#42");
    }
}
