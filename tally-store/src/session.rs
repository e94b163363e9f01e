//! Session manager.
//!
//! Owns the current [`SessionState`] and is its only writer. Views read the
//! state synchronously or subscribe to changes through a watch channel.
//!
//! Two authentication modes are supported:
//! - password: tokens from the account service, verified at startup through
//!   the "current user" endpoint
//! - identity wallet: an identity produced by the external wallet widget,
//!   restored from local storage without remote verification
//!
//! Which mode is active is decided in one place, [`Credentials`].

use serde_json::Value;
use tally_core::{AuthMode, Identity};
use tally_fetch::{ApiClient, ApiError, Credentials, LoginResponse, Registration};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Fallback message for failed logins.
pub const LOGIN_FAILED: &str = "Login failed";

/// Fallback message for failed registrations.
pub const REGISTRATION_FAILED: &str = "Registration failed";

// ============================================================================
// State
// ============================================================================

/// Authentication state of one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Startup verification has not finished.
    #[default]
    Unknown,
    /// Signed in.
    Authenticated(Identity),
    /// Signed out.
    Anonymous,
}

impl SessionState {
    /// Returns true when signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The signed-in identity.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// The active mode, when signed in.
    pub fn mode(&self) -> Option<AuthMode> {
        self.identity().map(Identity::mode)
    }
}

// ============================================================================
// Failure
// ============================================================================

/// A failed session operation, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct AuthFailure {
    /// Human-readable message.
    pub message: String,
    /// Server error payload, e.g. per-field registration errors.
    pub details: Option<Value>,
}

impl AuthFailure {
    /// Creates a failure with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Builds the user-facing failure for a request error.
    ///
    /// Prefers the server's message, then the flattened field errors, then
    /// `fallback`.
    pub fn from_api(error: &ApiError, fallback: &str) -> Self {
        let details = error.payload().cloned();
        let message = error
            .server_message()
            .map(str::to_string)
            .or_else(|| details.as_ref().and_then(flatten_field_errors))
            .unwrap_or_else(|| fallback.to_string());
        Self { message, details }
    }
}

/// Renders `{"username": ["taken"], "non_field_errors": ["x"]}` as
/// `"username: taken; x"`.
fn flatten_field_errors(payload: &Value) -> Option<String> {
    let fields = payload.as_object()?;
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|(field, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => return None,
            };
            if text.is_empty() {
                None
            } else if field == "non_field_errors" {
                Some(text)
            } else {
                Some(format!("{field}: {text}"))
            }
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

// ============================================================================
// Route Guard
// ============================================================================

/// Application views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Login and registration.
    Auth,
    /// Dashboard.
    Dashboard,
    /// Receipt upload.
    Upload,
    /// Stored receipts.
    Data,
    /// AI assistant.
    Assistant,
    /// Anything else.
    NotFound,
}

impl Route {
    /// Maps a path to its view.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/auth" | "/login" => Self::Auth,
            "" | "/dashboard" => Self::Dashboard,
            "/upload" => Self::Upload,
            "/data" | "/receipts" => Self::Data,
            "/assistant" | "/chat" => Self::Assistant,
            _ => Self::NotFound,
        }
    }

    /// Public views are reachable without signing in.
    pub fn is_public(self) -> bool {
        matches!(self, Self::Auth | Self::NotFound)
    }
}

/// Guard decision for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Render the view.
    Allow,
    /// Verification still running; render nothing protected yet.
    Pending,
    /// Send the user to the login view.
    RedirectToLogin,
}

// ============================================================================
// Session Manager
// ============================================================================

/// Holds the current identity and runs the authentication flows.
#[derive(Debug)]
pub struct SessionManager {
    client: ApiClient,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Creates a manager in the [`SessionState::Unknown`] state.
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self { client, state }
    }

    /// The client this manager issues requests through.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Route-guard predicate.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// The signed-in identity.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Decides whether a route may render.
    pub fn guard(&self, route: Route) -> Access {
        if route.is_public() {
            return Access::Allow;
        }
        match &*self.state.borrow() {
            SessionState::Unknown => Access::Pending,
            SessionState::Authenticated(_) => Access::Allow,
            SessionState::Anonymous => Access::RedirectToLogin,
        }
    }

    fn set_state(&self, state: SessionState) {
        debug!(authenticated = state.is_authenticated(), "Session state changed");
        self.state.send_replace(state);
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Startup verification.
    ///
    /// A stored wallet session is trusted as-is. Otherwise the account
    /// service's "current user" endpoint decides; any failure means
    /// anonymous.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        match Credentials::load(self.client.credentials().as_ref()).await {
            Ok(Some(Credentials::Wallet { identity, .. })) => {
                info!(id = %identity.id, "Restored identity-wallet session");
                self.set_state(SessionState::Authenticated(identity));
                return self.state();
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read stored credentials"),
        }

        let next = match self.client.account().me().await {
            Ok(profile) => {
                let identity = profile.into_identity();
                info!(id = %identity.id, "Session verified");
                SessionState::Authenticated(identity)
            }
            Err(e) => {
                debug!(error = %e, "No valid session");
                SessionState::Anonymous
            }
        };
        self.set_state(next);
        self.state()
    }

    /// Signs in with a username and password.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthFailure> {
        match self.client.account().login(username, password).await {
            Ok(response) => self.accept_password_login(response).await,
            Err(e) => {
                warn!(error = %e, "Login rejected");
                Err(AuthFailure::from_api(&e, LOGIN_FAILED))
            }
        }
    }

    /// Creates an account and signs in as it.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<Identity, AuthFailure> {
        match self.client.account().register(registration).await {
            Ok(response) => self.accept_password_login(response).await,
            Err(e) => {
                warn!(error = %e, "Registration rejected");
                Err(AuthFailure::from_api(&e, REGISTRATION_FAILED))
            }
        }
    }

    /// Accepts an identity already authenticated by the wallet widget.
    ///
    /// Never contacts the account service.
    #[instrument(skip(self, identity, token), fields(id = %identity.id))]
    pub async fn login_with_identity_wallet(
        &self,
        identity: Identity,
        token: impl Into<String>,
    ) -> Result<Identity, AuthFailure> {
        if identity.mode() != AuthMode::IdentityWallet {
            return Err(AuthFailure::new(
                "Identity was not issued by the identity wallet",
            ));
        }

        let credentials = Credentials::Wallet {
            token: token.into(),
            identity: identity.clone(),
        };
        self.store(&credentials).await?;

        info!(method = %identity.auth_method, "Identity-wallet sign-in");
        self.set_state(SessionState::Authenticated(identity.clone()));
        Ok(identity)
    }

    /// Signs out of whichever mode is active. Never fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let mode = self.current_mode().await;
        let store = self.client.credentials();

        if mode == AuthMode::Password {
            if let Err(e) = self.client.account().logout().await {
                warn!(error = %e, "Logout request failed");
            }
        }

        if let Err(e) = store.apply(&Credentials::clearing(mode)).await {
            warn!(error = %e, "Failed to clear credentials");
        }

        info!(%mode, "Signed out");
        self.set_state(SessionState::Anonymous);
    }

    /// The active mode: from what is stored, otherwise from the state.
    ///
    /// Stored credentials win so that logout clears the keys the next
    /// `initialize` would restore from.
    async fn current_mode(&self) -> AuthMode {
        match Credentials::load(self.client.credentials().as_ref()).await {
            Ok(Some(credentials)) => return credentials.mode(),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read stored credentials"),
        }
        self.state.borrow().mode().unwrap_or(AuthMode::Password)
    }

    async fn accept_password_login(&self, response: LoginResponse) -> Result<Identity, AuthFailure> {
        match response.access {
            Some(access) => {
                self.store(&Credentials::Password {
                    access,
                    refresh: response.refresh,
                })
                .await?;
            }
            // Cookie-session deployments issue no tokens; the wallet session
            // still has to go.
            None => {
                self.client
                    .credentials()
                    .apply(&Credentials::clearing(AuthMode::IdentityWallet))
                    .await
                    .map_err(|e| AuthFailure::new(format!("Could not store credentials: {e}")))?;
            }
        }

        let identity = response.profile.into_identity();
        info!(id = %identity.id, "Password sign-in");
        self.set_state(SessionState::Authenticated(identity.clone()));
        Ok(identity)
    }

    async fn store(&self, credentials: &Credentials) -> Result<(), AuthFailure> {
        let changes = credentials
            .activation()
            .map_err(|e| AuthFailure::new(format!("Could not store credentials: {e}")))?;
        self.client
            .credentials()
            .apply(&changes)
            .await
            .map_err(|e| AuthFailure::new(format!("Could not store credentials: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_routes() {
        assert_eq!(Route::from_path("/"), Route::Dashboard);
        assert_eq!(Route::from_path("/upload/"), Route::Upload);
        assert_eq!(Route::from_path("/nowhere"), Route::NotFound);
        assert!(Route::Auth.is_public());
        assert!(!Route::Data.is_public());
    }

    #[test]
    fn test_flatten_field_errors() {
        let payload = json!({
            "username": ["A user with that username already exists."],
            "non_field_errors": ["Passwords must match."]
        });
        let text = flatten_field_errors(&payload).unwrap();
        assert!(text.contains("username: A user with that username already exists."));
        assert!(text.contains("Passwords must match."));
        assert!(!text.contains("non_field_errors"));
        assert!(flatten_field_errors(&json!({})).is_none());
    }

    #[test]
    fn test_failure_fallback() {
        let failure = AuthFailure::from_api(&ApiError::NoRefreshToken, LOGIN_FAILED);
        assert_eq!(failure.message, LOGIN_FAILED);
        assert!(failure.details.is_none());
    }
}
