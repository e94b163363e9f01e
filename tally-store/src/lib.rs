// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tally Store
//!
//! Client-side state for the Tally receipt client.
//!
//! This crate provides:
//!
//! - **SessionManager**: Authentication lifecycle, credential persistence and
//!   the route guard, observable via a watch channel
//! - **UploadPipeline**: OCR then per-item persistence for each submitted
//!   file, with an append-only event stream
//! - **ReceiptBook**: Stored items grouped into receipts, with search
//! - **Dashboard**: Statistics and insights loaded together
//! - **SettingsStore**: User preferences with persistence
//!
//! ## Usage
//!
//! ```ignore
//! use tally_store::{SessionManager, SettingsStore, UploadPipeline};
//!
//! let settings = SettingsStore::load_default().await?.get().await;
//! let client = settings.connect(&default_config_dir()).await?;
//!
//! let session = SessionManager::new(client.clone());
//! session.initialize().await;
//!
//! let pipeline = UploadPipeline::new(client);
//! let mut events = pipeline.subscribe();
//! let outcome = pipeline.submit(SourceFile::open("receipt.png").await?).await;
//! ```

pub mod dashboard;
pub mod error;
pub mod persistence;
pub mod receipt_book;
pub mod session;
pub mod settings;
pub mod upload;

pub use dashboard::{Dashboard, SummaryCard};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, load_json, load_json_or_default, save_json,
};
pub use receipt_book::ReceiptBook;
pub use session::{Access, AuthFailure, Route, SessionManager, SessionState};
pub use settings::{CredentialBackend, LogLevel, Settings, SettingsStore, TransportMode};
pub use upload::{SourceFile, UploadEvent, UploadOutcome, UploadPipeline};
