//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;
use tally_core::{ExtractedReceipt, ReceiptGroup, UploadStatus};
use tally_store::{Dashboard, Settings, SummaryCard, UploadOutcome};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutput<'a> {
    pub filename: &'a str,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<&'a str>,
    pub message: &'a str,
    pub attempted: usize,
    pub saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<&'a ExtractedReceipt>,
}

impl<'a> From<&'a UploadOutcome> for UploadOutput<'a> {
    fn from(outcome: &'a UploadOutcome) -> Self {
        Self {
            filename: &outcome.record.filename,
            status: outcome.record.status,
            amount: outcome.record.amount.as_deref(),
            message: &outcome.message,
            attempted: outcome.attempted,
            saved: outcome.saved,
            receipt: outcome.receipt.as_ref(),
        }
    }
}

/// Receipt listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptsOutput<'a> {
    pub count: usize,
    pub total_amount: f64,
    pub receipts: Vec<&'a ReceiptGroup>,
}

impl<'a> ReceiptsOutput<'a> {
    /// Builds the listing from a filtered selection.
    pub fn new(receipts: Vec<&'a ReceiptGroup>) -> Self {
        Self {
            count: receipts.len(),
            total_amount: receipts.iter().map(|g| g.amount).sum(),
            receipts,
        }
    }
}

/// Dashboard figures.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOutput<'a> {
    pub cards: Vec<SummaryCard>,
    #[serde(flatten)]
    pub dashboard: &'a Dashboard,
}

/// Assistant answer or failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutput<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Settings with the session cookie redacted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOutput<'a> {
    pub path: String,
    pub base_url: &'a str,
    pub transport: String,
    pub session_cookie_set: bool,
    pub request_timeout_secs: u64,
    pub credential_backend: String,
    pub log_level: String,
}

impl<'a> SettingsOutput<'a> {
    /// Builds the output for settings stored at `path`.
    pub fn new(settings: &'a Settings, path: String) -> Self {
        Self {
            path,
            base_url: &settings.base_url,
            transport: settings.transport.to_string(),
            session_cookie_set: settings.session_cookie.is_some(),
            request_timeout_secs: settings.request_timeout_secs,
            credential_backend: settings.credential_backend.to_string(),
            log_level: settings.log_level.to_string(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
