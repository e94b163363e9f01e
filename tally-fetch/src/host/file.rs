//! File-backed credential store.
//!
//! All credentials live in one JSON object. Each update rewrites the whole
//! file through a temp file and a rename, so a batch is never half-applied.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::credentials::{CredentialChange, CredentialStore};
use crate::error::CredentialError;

/// Default file name inside the config directory.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Credential store persisted as a JSON file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// A file that exists but cannot be parsed is treated as empty and will
    /// be overwritten on the next update.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, CredentialError> {
        let values = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(error = %e, "Credential file is corrupt, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No credential file yet");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    /// Returns the default credential file path inside `config_dir`.
    pub fn default_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CREDENTIALS_FILE)
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(values)?;
        let temp_path = self.path.with_extension("json.tmp");
        write_owner_only(&temp_path, json.as_bytes()).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), keys = values.len(), "Credentials saved");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn apply(&self, changes: &[CredentialChange]) -> Result<(), CredentialError> {
        let mut values = self.values.lock().await;
        let mut next = values.clone();
        for change in changes {
            change.apply_to(&mut next);
        }
        if next == *values {
            return Ok(());
        }

        self.persist(&next).await?;
        *values = next;
        Ok(())
    }
}

/// Writes `bytes` to a fresh file that is created with 0600 on Unix, so the
/// contents are never readable by others. A leftover file at `path` is
/// replaced.
async fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<(), CredentialError> {
    use tokio::io::AsyncWriteExt;

    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed stale temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::keys;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = FileCredentialStore::default_path(dir.path());

        let store = FileCredentialStore::open(&path).await.unwrap();
        store
            .apply(&[
                CredentialChange::set(keys::ACCESS_TOKEN, "a"),
                CredentialChange::set(keys::REFRESH_TOKEN, "r"),
            ])
            .await
            .unwrap();
        drop(store);

        let reopened = FileCredentialStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).await.unwrap().as_deref(), Some("a"));
        assert_eq!(reopened.get(keys::REFRESH_TOKEN).await.unwrap().as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(&dir.path().join("nested").join("c.json"))
            .await
            .unwrap();
        assert!(store.get(keys::ACCESS_TOKEN).await.unwrap().is_none());

        // First write creates the parent directory.
        store.set(keys::ACCESS_TOKEN, "a").await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileCredentialStore::open(&path).await.unwrap();
        assert!(store.get(keys::WALLET_TOKEN).await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_world_readable_temp_file_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, "stale").await.unwrap();
        tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o644))
            .await
            .unwrap();

        let store = FileCredentialStore::open(&path).await.unwrap();
        store.set(keys::ACCESS_TOKEN, "secret").await.unwrap();

        assert!(!temp_path.exists());
        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("secret"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::open(&path).await.unwrap();
        store.set(keys::ACCESS_TOKEN, "secret").await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Credential file should have 0600 permissions");
    }
}
