// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tally Fetch
//!
//! The single request-issuing facility of the Tally client, plus the durable
//! credential storage it reads from.
//!
//! ## HTTP Client Wrapper
//!
//! - [`client::ApiClient`] - Attaches credentials, refreshes once on 401
//! - [`request::ApiRequest`] - Re-issuable request description
//! - [`error::ApiError`] - Network / auth / validation / server taxonomy
//!
//! ## Credential Storage
//!
//! - [`credentials::CredentialStore`] - Async key/value store with atomic batches
//! - [`credentials::Credentials`] - Password or wallet credentials, one mode at a time
//! - [`host::file`] - JSON file backend
//! - [`host::keychain`] - System keychain backend
//!
//! ## Backend Services
//!
//! - [`account::AccountApi`] - Login, registration, logout, current user
//! - [`receipts::ReceiptsApi`] - OCR, item persistence, listing, statistics
//! - [`chat::ChatApi`] - Assistant queries and insights
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tally_fetch::{ApiClient, MemoryCredentialStore};
//!
//! let client = ApiClient::builder("http://localhost:8000")
//!     .credentials(Arc::new(MemoryCredentialStore::new()))
//!     .build()?;
//!
//! let me = client.account().me().await?;
//! ```

pub mod account;
pub mod chat;
pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod host;
pub mod receipts;
pub mod request;

// Errors
pub use error::{ApiError, CredentialError};

// Client
pub use client::{ApiClient, ApiClientBuilder, AuthTransport};
pub use request::{ApiRequest, RequestBody};

// Credentials
pub use credentials::{
    CredentialChange, CredentialStore, Credentials, MemoryCredentialStore, keys,
};
pub use host::{file::FileCredentialStore, keychain::KeychainCredentialStore};

// Services
pub use account::{AccountApi, LoginResponse, Registration};
pub use chat::ChatApi;
pub use receipts::ReceiptsApi;
