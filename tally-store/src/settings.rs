//! User preferences store.
//!
//! Manages user settings with persistence and change notification, and turns
//! them into a configured [`ApiClient`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tally_fetch::{
    ApiClient, AuthTransport, CredentialStore, FileCredentialStore, KeychainCredentialStore,
    MemoryCredentialStore,
};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Environment variable overriding the backend URL.
pub const ENV_BASE_URL: &str = "TALLY_BASE_URL";

/// Environment variable overriding the credential backend.
pub const ENV_CREDENTIAL_BACKEND: &str = "TALLY_CREDENTIAL_BACKEND";

/// Backend URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend base URL.
    pub base_url: String,

    /// How credentials ride on requests.
    pub transport: TransportMode,

    /// Session cookie for cookie-session deployments.
    pub session_cookie: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Where credentials are kept.
    pub credential_backend: CredentialBackend,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            transport: TransportMode::default(),
            session_cookie: None,
            request_timeout_secs: tally_fetch::client::DEFAULT_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Credential transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Bearer access token.
    #[default]
    Bearer,
    /// Session cookie plus anti-forgery header.
    CookieSession,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Bearer => write!(f, "bearer"),
            TransportMode::CookieSession => write!(f, "cookie_session"),
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(TransportMode::Bearer),
            "cookie_session" | "cookie" => Ok(TransportMode::CookieSession),
            other => Err(StoreError::Config(format!("unknown transport: {other}"))),
        }
    }
}

/// Credential storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// JSON file next to the settings.
    #[default]
    File,
    /// System keychain.
    Keychain,
    /// Process memory only; nothing survives exit.
    Memory,
}

impl std::fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialBackend::File => write!(f, "file"),
            CredentialBackend::Keychain => write!(f, "keychain"),
            CredentialBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for CredentialBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(CredentialBackend::File),
            "keychain" => Ok(CredentialBackend::Keychain),
            "memory" => Ok(CredentialBackend::Memory),
            other => Err(StoreError::Config(format!("unknown credential backend: {other}"))),
        }
    }
}

/// Log level options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Info and above.
    Info,
    /// Debug and above.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// Directive for an `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(StoreError::Config(format!("unknown log level: {other}"))),
        }
    }
}

// ============================================================================
// Settings Operations
// ============================================================================

impl Settings {
    /// Names accepted by [`Settings::set`].
    pub const KEYS: &'static [&'static str] = &[
        "base_url",
        "transport",
        "session_cookie",
        "request_timeout_secs",
        "credential_backend",
        "log_level",
    ];

    /// Applies environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from a variable lookup. Invalid values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            debug!(%url, "Base URL overridden from environment");
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_CREDENTIAL_BACKEND) {
            match raw.parse() {
                Ok(backend) => self.credential_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {ENV_CREDENTIAL_BACKEND}"),
            }
        }
    }

    /// Sets one field from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        match key {
            "base_url" => {
                Url::parse(value).map_err(|e| StoreError::Config(format!("base_url: {e}")))?;
                self.base_url = value.to_string();
            }
            "transport" => self.transport = value.parse()?,
            "session_cookie" => {
                self.session_cookie = (!value.is_empty()).then(|| value.to_string());
            }
            "request_timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e| StoreError::Config(format!("request_timeout_secs: {e}")))?;
                if secs == 0 {
                    return Err(StoreError::Config(
                        "request_timeout_secs must be positive".to_string(),
                    ));
                }
                self.request_timeout_secs = secs;
            }
            "credential_backend" => self.credential_backend = value.parse()?,
            "log_level" => self.log_level = value.parse()?,
            other => {
                return Err(StoreError::Config(format!(
                    "unknown setting '{other}' (expected one of: {})",
                    Self::KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The client transport. Cookie sessions need a configured cookie.
    pub fn auth_transport(&self) -> Result<AuthTransport, StoreError> {
        match self.transport {
            TransportMode::Bearer => Ok(AuthTransport::Bearer),
            TransportMode::CookieSession => match &self.session_cookie {
                Some(cookie) if !cookie.trim().is_empty() => Ok(AuthTransport::CookieSession {
                    cookie: cookie.clone(),
                }),
                _ => Err(StoreError::Config(
                    "cookie_session transport requires session_cookie".to_string(),
                )),
            },
        }
    }

    /// Keychain profile: the backend's host and port.
    pub fn profile(&self) -> String {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|url| {
                let host = url.host_str()?.to_string();
                Some(match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                })
            })
            .unwrap_or_else(|| self.base_url.clone())
    }

    /// Opens the configured credential store.
    pub async fn credential_store(
        &self,
        config_dir: &Path,
    ) -> Result<Arc<dyn CredentialStore>, StoreError> {
        let store: Arc<dyn CredentialStore> = match self.credential_backend {
            CredentialBackend::File => Arc::new(
                FileCredentialStore::open(&FileCredentialStore::default_path(config_dir)).await?,
            ),
            CredentialBackend::Keychain => Arc::new(KeychainCredentialStore::new(self.profile())),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };
        debug!(backend = %self.credential_backend, "Credential store opened");
        Ok(store)
    }

    /// Builds a client over the configured credential store.
    pub async fn connect(&self, config_dir: &Path) -> Result<ApiClient, StoreError> {
        let store = self.credential_store(config_dir).await?;
        self.client(store)
    }

    /// Builds a client over a given credential store.
    pub fn client(&self, store: Arc<dyn CredentialStore>) -> Result<ApiClient, StoreError> {
        Ok(ApiClient::builder(&self.base_url)
            .timeout(self.timeout())
            .transport(self.auth_transport()?)
            .credentials(store)
            .build()?)
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a new settings store.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path. A missing or unreadable file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// The settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Settings) -> T,
    {
        let result = {
            let mut settings = self.settings.write().await;
            f(&mut settings)
        };
        self.notify_change().await;
        result
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }
}

// ============================================================================
// Tests
// ============================================================================
