// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tally Core
//!
//! Core types and models for the Tally receipt client.
//!
//! This crate provides the foundational types shared by every other Tally
//! crate:
//!
//! - Domain models (identities, receipts, upload records, insights)
//! - The core error type
//!
//! ## Key Types
//!
//! ### Identity
//! - [`Identity`] - The signed-in user, in either authentication mode
//! - [`AuthMethod`] / [`AuthMode`] - How the identity was established
//! - [`UserProfile`] - Profile payload returned by the account service
//!
//! ### Receipts
//! - [`ExtractedReceipt`] - Structured OCR output for one upload
//! - [`ReceiptItem`] - A persisted line item from the receipts listing
//! - [`ReceiptGroup`] - Items grouped into one logical receipt
//!
//! ### Uploads
//! - [`UploadRecord`] - Client-side unit of work for one submitted file
//! - [`UploadStatus`] / [`FailureReason`] - Lifecycle state
//!
//! ### Insights
//! - [`Statistics`], [`Insights`], [`CategoryTotal`], [`StoreTotal`], [`ChatReply`]

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Identity
    AuthMethod,
    AuthMode,
    Identity,
    UserProfile,
    // Receipts
    DEFAULT_CATEGORY,
    ExtractedReceipt,
    LineItem,
    NewReceiptItem,
    OcrResult,
    ReceiptGroup,
    ReceiptItem,
    format_currency,
    // Uploads
    FailureReason,
    UploadId,
    UploadRecord,
    UploadStatus,
    // Insights
    CategoryTotal,
    ChatReply,
    Insights,
    Statistics,
    StoreTotal,
};
