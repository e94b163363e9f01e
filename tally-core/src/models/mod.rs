//! Domain models for Tally.
//!
//! ## Submodules
//!
//! - [`identity`] - Signed-in user and authentication modes
//! - [`receipt`] - OCR output, persisted items and receipt grouping
//! - [`upload`] - Upload records and their lifecycle
//! - [`insights`] - Dashboard statistics, insights and chat replies

mod de;
mod identity;
mod insights;
mod receipt;
mod upload;

pub use identity::{AuthMethod, AuthMode, Identity, UserProfile};
pub use insights::{CategoryTotal, ChatReply, Insights, Statistics, StoreTotal};
pub use receipt::{
    DEFAULT_CATEGORY, ExtractedReceipt, LineItem, NewReceiptItem, OcrResult, ReceiptGroup,
    ReceiptItem, format_currency,
};
pub use upload::{FailureReason, UploadId, UploadRecord, UploadStatus};
#[cfg(test)]
mod serde_tests;
