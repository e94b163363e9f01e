//! Durable credential backends.
//!
//! - [`file`] - JSON file in the user's config directory
//! - [`keychain`] - System keychain (macOS Keychain, Windows Credential
//!   Manager, Secret Service)

pub mod file;
pub mod keychain;
