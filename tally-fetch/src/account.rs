//! Account service: login, registration, logout and the current user.

use serde::{Deserialize, Serialize};
use tally_core::UserProfile;
use tracing::{debug, instrument};

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::ApiError;
use crate::request::ApiRequest;

// ============================================================================
// Payloads
// ============================================================================

/// Successful login body: optional tokens plus the profile fields.
///
/// Cookie-session deployments answer with the profile only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    /// Access token.
    #[serde(default)]
    pub access: Option<String>,
    /// Refresh token.
    #[serde(default)]
    pub refresh: Option<String>,
    /// Everything else.
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Renewed tokens. Servers that rotate refresh tokens also return `refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    /// New access token.
    pub access: String,
    /// Rotated refresh token.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// New-account form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Optional full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Password.
    pub password: String,
}

impl Registration {
    /// Creates a registration without a full name.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            full_name: None,
            password: password.into(),
        }
    }

    /// Sets the full name.
    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }
}

#[derive(Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
}

// ============================================================================
// Service
// ============================================================================

/// Account endpoints.
#[derive(Debug, Clone)]
pub struct AccountApi {
    client: ApiClient,
}

impl AccountApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchanges a username and password for tokens and a profile.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request =
            ApiRequest::post_json(endpoints::LOGIN, &LoginForm { username, password })?.without_refresh();
        let response: LoginResponse = self.client.send_json(&request).await?;
        debug!(id = %response.profile.id, has_tokens = response.access.is_some(), "Logged in");
        Ok(response)
    }

    /// Creates an account. The body may also carry tokens.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post_json(endpoints::REGISTER, registration)?.without_refresh();
        self.client.send_json(&request).await
    }

    /// Invalidates the server-side session.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.client
            .send_discard(&ApiRequest::post_empty(endpoints::LOGOUT))
            .await
    }

    /// Returns the profile of the current session.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.client.get_json(endpoints::ME).await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.client.refresh_tokens(refresh_token).await
    }
}

// ============================================================================
// Tests
// ============================================================================
