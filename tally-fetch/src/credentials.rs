//! Durable credential storage.
//!
//! Credentials are string-keyed values. Password mode uses
//! [`keys::ACCESS_TOKEN`] and [`keys::REFRESH_TOKEN`]; identity-wallet mode
//! uses [`keys::WALLET_TOKEN`] and [`keys::WALLET_IDENTITY`].
//!
//! Every multi-key update goes through [`CredentialStore::apply`], which
//! backends must make atomic: a reader never observes a refreshed access
//! token next to a stale refresh token.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tally_core::{AuthMode, Identity};
use tracing::{debug, warn};

use crate::error::CredentialError;

/// Storage keys.
pub mod keys {
    /// Password-mode bearer token.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Password-mode renewal token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Opaque identity-wallet session token.
    pub const WALLET_TOKEN: &str = "wallet_token";
    /// Serialized wallet-mode [`Identity`](tally_core::Identity).
    pub const WALLET_IDENTITY: &str = "wallet_identity";

    /// Keys belonging to password mode.
    pub const PASSWORD: &[&str] = &[ACCESS_TOKEN, REFRESH_TOKEN];
    /// Keys belonging to identity-wallet mode.
    pub const WALLET: &[&str] = &[WALLET_TOKEN, WALLET_IDENTITY];
}

// ============================================================================
// Changes
// ============================================================================

/// One step of an atomic credential update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialChange {
    /// Store a value.
    Set(String, String),
    /// Delete a key (no-op if absent).
    Remove(String),
}

impl CredentialChange {
    /// Creates a set change.
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        Self::Set(key.to_string(), value.into())
    }

    /// Creates a remove change.
    pub fn remove(key: &str) -> Self {
        Self::Remove(key.to_string())
    }

    /// Applies this change to an in-memory map.
    pub fn apply_to(&self, map: &mut HashMap<String, String>) {
        match self {
            Self::Set(key, value) => {
                map.insert(key.clone(), value.clone());
            }
            Self::Remove(key) => {
                map.remove(key);
            }
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Durable key/value store for session credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads one value.
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;

    /// Applies all changes as a single atomic update.
    async fn apply(&self, changes: &[CredentialChange]) -> Result<(), CredentialError>;

    /// Stores one value.
    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.apply(&[CredentialChange::set(key, value)]).await
    }

    /// Deletes one value.
    async fn remove(&self, key: &str) -> Result<(), CredentialError> {
        self.apply(&[CredentialChange::remove(key)]).await
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// The credentials of exactly one authentication mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Token pair from the account service.
    Password {
        /// Bearer token.
        access: String,
        /// Renewal token, if the server issued one.
        refresh: Option<String>,
    },
    /// Session from the identity-wallet widget.
    Wallet {
        /// Opaque wallet session token.
        token: String,
        /// Identity reported by the widget.
        identity: Identity,
    },
}

impl Credentials {
    /// The mode these credentials belong to.
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Password { .. } => AuthMode::Password,
            Self::Wallet { .. } => AuthMode::IdentityWallet,
        }
    }

    /// Changes that store these credentials and drop the other mode's.
    pub fn activation(&self) -> Result<Vec<CredentialChange>, CredentialError> {
        let mut changes = Self::clearing(match self.mode() {
            AuthMode::Password => AuthMode::IdentityWallet,
            AuthMode::IdentityWallet => AuthMode::Password,
        });

        match self {
            Self::Password { access, refresh } => {
                changes.push(CredentialChange::set(keys::ACCESS_TOKEN, access.clone()));
                changes.push(match refresh {
                    Some(refresh) => CredentialChange::set(keys::REFRESH_TOKEN, refresh.clone()),
                    None => CredentialChange::remove(keys::REFRESH_TOKEN),
                });
            }
            Self::Wallet { token, identity } => {
                changes.push(CredentialChange::set(keys::WALLET_TOKEN, token.clone()));
                changes.push(CredentialChange::set(
                    keys::WALLET_IDENTITY,
                    serde_json::to_string(identity)?,
                ));
            }
        }

        Ok(changes)
    }

    /// Changes that delete every key of one mode.
    pub fn clearing(mode: AuthMode) -> Vec<CredentialChange> {
        let keys = match mode {
            AuthMode::Password => keys::PASSWORD,
            AuthMode::IdentityWallet => keys::WALLET,
        };
        keys.iter().map(|k| CredentialChange::remove(k)).collect()
    }

    /// Loads whichever credentials are stored, wallet mode first.
    ///
    /// A wallet token whose identity is missing, unreadable or not a wallet
    /// identity is ignored.
    pub async fn load(store: &dyn CredentialStore) -> Result<Option<Self>, CredentialError> {
        if let Some(token) = store.get(keys::WALLET_TOKEN).await? {
            match store.get(keys::WALLET_IDENTITY).await? {
                Some(raw) => match serde_json::from_str::<Identity>(&raw) {
                    Ok(identity) if identity.mode() == AuthMode::IdentityWallet => {
                        debug!(id = %identity.id, "Loaded wallet credentials");
                        return Ok(Some(Self::Wallet { token, identity }));
                    }
                    Ok(identity) => warn!(
                        id = %identity.id,
                        method = %identity.auth_method,
                        "Stored wallet identity was not issued by the wallet"
                    ),
                    Err(e) => warn!(error = %e, "Stored wallet identity is unreadable"),
                },
                None => warn!("Wallet token stored without an identity"),
            }
        }

        if let Some(access) = store.get(keys::ACCESS_TOKEN).await? {
            let refresh = store.get(keys::REFRESH_TOKEN).await?;
            debug!(has_refresh = refresh.is_some(), "Loaded password credentials");
            return Ok(Some(Self::Password { access, refresh }));
        }

        Ok(None)
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// Process-local store, used for `--ephemeral` sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with values.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a consistent map: every write is one insert/remove.
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn apply(&self, changes: &[CredentialChange]) -> Result<(), CredentialError> {
        let mut values = self.lock();
        for change in changes {
            change.apply_to(&mut values);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::AuthMethod;

    fn wallet_identity() -> Identity {
        Identity::new("w-1", "Wally", AuthMethod::Wallet).with_wallet_address("0x1")
    }

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryCredentialStore::new();
        store.set(keys::ACCESS_TOKEN, "a").await.unwrap();
        assert_eq!(store.get(keys::ACCESS_TOKEN).await.unwrap().as_deref(), Some("a"));

        store.remove(keys::ACCESS_TOKEN).await.unwrap();
        assert!(store.get(keys::ACCESS_TOKEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_activation_clears_wallet() {
        let store = MemoryCredentialStore::with_values([
            (keys::WALLET_TOKEN, "w"),
            (keys::WALLET_IDENTITY, "{}"),
        ]);

        let creds = Credentials::Password {
            access: "a".to_string(),
            refresh: Some("r".to_string()),
        };
        store.apply(&creds.activation().unwrap()).await.unwrap();

        assert!(store.get(keys::WALLET_TOKEN).await.unwrap().is_none());
        assert!(store.get(keys::WALLET_IDENTITY).await.unwrap().is_none());
        assert_eq!(Credentials::load(&store).await.unwrap(), Some(creds));
    }

    #[tokio::test]
    async fn test_wallet_loaded_before_password() {
        let store = MemoryCredentialStore::new();
        let wallet = Credentials::Wallet {
            token: "w".to_string(),
            identity: wallet_identity(),
        };
        store.apply(&wallet.activation().unwrap()).await.unwrap();
        // Stale password token written by some other path.
        store.set(keys::ACCESS_TOKEN, "stale").await.unwrap();

        let loaded = Credentials::load(&store).await.unwrap().unwrap();
        assert_eq!(loaded.mode(), AuthMode::IdentityWallet);
        assert_eq!(loaded, wallet);
    }

    #[tokio::test]
    async fn test_corrupt_wallet_identity_falls_through() {
        let store = MemoryCredentialStore::with_values([
            (keys::WALLET_TOKEN, "w"),
            (keys::WALLET_IDENTITY, "not json"),
            (keys::ACCESS_TOKEN, "a"),
        ]);

        let loaded = Credentials::load(&store).await.unwrap().unwrap();
        assert_eq!(loaded.mode(), AuthMode::Password);
    }

    #[tokio::test]
    async fn test_password_identity_in_wallet_slot_is_ignored() {
        let identity = Identity::new("7", "Ada", AuthMethod::Password);
        let store = MemoryCredentialStore::with_values([
            (keys::WALLET_TOKEN, "w".to_string()),
            (
                keys::WALLET_IDENTITY,
                serde_json::to_string(&identity).unwrap(),
            ),
        ]);

        assert!(Credentials::load(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_empty() {
        let store = MemoryCredentialStore::new();
        assert!(Credentials::load(&store).await.unwrap().is_none());
    }

    #[test]
    fn test_clearing_keys() {
        let changes = Credentials::clearing(AuthMode::Password);
        assert_eq!(
            changes,
            vec![
                CredentialChange::remove(keys::ACCESS_TOKEN),
                CredentialChange::remove(keys::REFRESH_TOKEN),
            ]
        );
    }
}
