//! Keychain-backed credential store.
//!
//! This module stores credentials in the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! All keys of a profile are kept in a single keychain entry holding a JSON
//! object, so a multi-key update is one keychain write.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, trace, warn};

use crate::credentials::{CredentialChange, CredentialStore};
use crate::error::CredentialError;

/// Keychain service name for Tally credentials.
const KEYCHAIN_SERVICE: &str = "tally";

/// Credential store backed by one keychain entry per profile.
#[derive(Debug)]
pub struct KeychainCredentialStore {
    account: String,
    // `None` until the entry has been read once.
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl KeychainCredentialStore {
    /// Creates a store for a profile (usually the backend host).
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            account: profile.into(),
            cache: Mutex::new(None),
        }
    }

    /// Returns the keychain service name.
    pub fn service() -> &'static str {
        KEYCHAIN_SERVICE
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Ok(Entry::new(KEYCHAIN_SERVICE, &self.account)?)
    }

    fn read_entry(&self) -> Result<HashMap<String, String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(blob) if blob.is_empty() => Ok(HashMap::new()),
            Ok(blob) => serde_json::from_str(&blob).map_err(|e| {
                warn!(account = %self.account, error = %e, "Keychain entry is not a credential map");
                CredentialError::Corrupt(e.to_string())
            }),
            Err(keyring::Error::NoEntry) => {
                trace!(account = %self.account, "No keychain entry");
                Ok(HashMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_entry(&self, values: &HashMap<String, String>) -> Result<(), CredentialError> {
        let entry = self.entry()?;
        if values.is_empty() {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            entry.set_password(&serde_json::to_string(values)?)?;
        }
        debug!(account = %self.account, keys = values.len(), "Keychain entry updated");
        Ok(())
    }

    fn with_cache<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> Result<T, CredentialError>,
    ) -> Result<T, CredentialError> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| CredentialError::Keychain("credential cache poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.read_entry()?);
        }
        f(guard.get_or_insert_with(HashMap::new))
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        self.with_cache(|values| Ok(values.get(key).cloned()))
    }

    async fn apply(&self, changes: &[CredentialChange]) -> Result<(), CredentialError> {
        self.with_cache(|values| {
            let mut next = values.clone();
            for change in changes {
                change.apply_to(&mut next);
            }
            if next != *values {
                self.write_entry(&next)?;
                *values = next;
            }
            Ok(())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
