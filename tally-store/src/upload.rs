//! Upload pipeline.
//!
//! Drives one file through OCR extraction and per-item persistence:
//!
//! ```text
//! submit ──► processing ──► OCR ──┬─► failed (OCR error / no items)
//!                                 └─► save N items ──┬─► processed
//!                                                    └─► failed (partial save)
//! ```
//!
//! Every state change is appended to an event log and broadcast, so views
//! can render from the stream instead of polling records.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tally_core::{
    ExtractedReceipt, FailureReason, NewReceiptItem, UploadId, UploadRecord, UploadStatus,
};
use tally_fetch::ApiClient;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

// ============================================================================
// Source File
// ============================================================================

/// The bytes of one selected file. Consumed by [`UploadPipeline::submit`].
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Original file name.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type, if known.
    pub mime: Option<String>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("size", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

impl SourceFile {
    /// Wraps in-memory bytes; the MIME type is guessed from the name.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime = guess_mime(&filename).map(str::to_string);
        Self {
            filename,
            bytes,
            mime,
        }
    }

    /// Reads a file from disk.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(filename, bytes))
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn guess_mime(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => return None,
    })
}

// ============================================================================
// Events
// ============================================================================

/// One entry of the append-only state-change stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    /// The record after the change.
    pub record: UploadRecord,
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    /// Final record.
    pub record: UploadRecord,
    /// OCR output, when OCR returned structured data.
    pub receipt: Option<ExtractedReceipt>,
    /// Item-creation requests issued.
    pub attempted: usize,
    /// Item-creation requests that succeeded.
    pub saved: usize,
    /// Message for the user.
    pub message: String,
}

impl UploadOutcome {
    /// Whether the record ended processed.
    pub fn is_success(&self) -> bool {
        self.record.status == UploadStatus::Processed
    }
}

// ============================================================================
// Pipeline
// ============================================================================

#[derive(Default)]
struct PipelineState {
    // Newest first.
    records: Vec<UploadRecord>,
    events: Vec<UploadEvent>,
    extracted: Option<ExtractedReceipt>,
}

/// Runs submissions and keeps the session's upload history.
pub struct UploadPipeline {
    client: ApiClient,
    next_id: AtomicU64,
    state: RwLock<PipelineState>,
    events: broadcast::Sender<UploadEvent>,
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl UploadPipeline {
    /// Creates a pipeline with an empty history.
    pub fn new(client: ApiClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            next_id: AtomicU64::new(1),
            state: RwLock::new(PipelineState::default()),
            events,
        }
    }

    /// Subscribes to state changes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    /// All records, newest first.
    pub async fn records(&self) -> Vec<UploadRecord> {
        self.state.read().await.records.clone()
    }

    /// One record.
    pub async fn record(&self, id: UploadId) -> Option<UploadRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// The full event log.
    pub async fn events(&self) -> Vec<UploadEvent> {
        self.state.read().await.events.clone()
    }

    /// The most recent OCR output, cleared when the next upload starts.
    pub async fn extracted(&self) -> Option<ExtractedReceipt> {
        self.state.read().await.extracted.clone()
    }

    /// Runs one file through OCR and persistence.
    ///
    /// Never fails: failures end up in the record's status and reason.
    /// The file's bytes are released before this returns.
    #[instrument(skip(self, file), fields(file = %file.filename, size = file.bytes.len()))]
    pub async fn submit(&self, file: SourceFile) -> UploadOutcome {
        let id = UploadId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut record = UploadRecord::new(id, file.filename.clone(), file.size());
        self.begin(&record).await;
        debug!(%id, "Upload registered");

        let SourceFile {
            filename,
            bytes,
            mime,
        } = file;

        let receipts = self.client.receipts();
        let receipt = match receipts.process_image(&filename, bytes, mime).await {
            Ok(result) => result.structured_data,
            Err(e) => {
                warn!(%id, error = %e, "OCR failed");
                let reason = FailureReason::ocr(e.server_message().map(str::to_string));
                return self.fail(record, reason, None, 0, 0).await;
            }
        };

        let Some(receipt) = receipt else {
            return self.fail(record, FailureReason::NoItems, None, 0, 0).await;
        };
        self.set_extracted(&receipt).await;

        if !receipt.has_items() {
            info!(%id, "OCR found no items");
            return self.fail(record, FailureReason::NoItems, Some(receipt), 0, 0).await;
        }

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let purchase_date = receipt.purchase_date_or(&today);
        let receipt_id = format!("{}_{}", receipt.store_label(), Uuid::new_v4().simple());
        let payloads: Vec<NewReceiptItem> = receipt
            .items
            .iter()
            .map(|item| NewReceiptItem::from_line(&receipt_id, &receipt, item, &purchase_date))
            .collect();

        let results = join_all(payloads.iter().map(|item| receipts.create_item(item))).await;
        let attempted = results.len();
        let saved = results.iter().filter(|r| r.is_ok()).count();

        if saved < attempted {
            for e in results.iter().filter_map(|r| r.as_ref().err()) {
                warn!(%id, error = %e, "Item save failed");
            }
            return self
                .fail(record, FailureReason::PartialSave, Some(receipt), attempted, saved)
                .await;
        }

        if let Err(e) = record.mark_processed(receipt.resolved_amount()) {
            warn!(%id, error = %e, "Unexpected upload transition");
        }
        self.publish(&record).await;
        info!(%id, items = saved, %receipt_id, "Upload processed");

        UploadOutcome {
            message: format!("Successfully processed and saved {saved} items from {filename}!"),
            record,
            receipt: Some(receipt),
            attempted,
            saved,
        }
    }

    async fn fail(
        &self,
        mut record: UploadRecord,
        reason: FailureReason,
        receipt: Option<ExtractedReceipt>,
        attempted: usize,
        saved: usize,
    ) -> UploadOutcome {
        let message = reason.to_string();
        if let Err(e) = record.mark_failed(reason) {
            warn!(id = %record.id, error = %e, "Unexpected upload transition");
        }
        self.publish(&record).await;

        UploadOutcome {
            record,
            receipt,
            attempted,
            saved,
            message,
        }
    }

    async fn set_extracted(&self, receipt: &ExtractedReceipt) {
        self.state.write().await.extracted = Some(receipt.clone());
    }

    /// Registers a new record and clears the previous Extracted Receipt.
    async fn begin(&self, record: &UploadRecord) {
        let mut state = self.state.write().await;
        state.extracted = None;
        self.append(&mut state, record);
    }

    /// Stores the record's new state and appends an event.
    async fn publish(&self, record: &UploadRecord) {
        let mut state = self.state.write().await;
        self.append(&mut state, record);
    }

    fn append(&self, state: &mut PipelineState, record: &UploadRecord) {
        match state.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => state.records.insert(0, record.clone()),
        }

        let event = UploadEvent {
            sequence: state.events.len() as u64 + 1,
            record: record.clone(),
        };
        state.events.push(event.clone());

        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("r.JPG"), Some("image/jpeg"));
        assert_eq!(guess_mime("scan.pdf"), Some("application/pdf"));
        assert_eq!(guess_mime("notes"), None);
    }

    #[test]
    fn test_source_file_debug_hides_bytes() {
        let file = SourceFile::new("r.png", vec![7; 64]);
        let debug = format!("{file:?}");
        assert!(debug.contains("size: 64"));
        assert!(!debug.contains("7, 7"));
    }

    #[tokio::test]
    async fn test_open_reads_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        tokio::fs::write(&path, b"img").await.unwrap();

        let file = SourceFile::open(&path).await.unwrap();
        assert_eq!(file.filename, "receipt.png");
        assert_eq!(file.size(), 3);
        assert_eq!(file.mime.as_deref(), Some("image/png"));
    }
}
