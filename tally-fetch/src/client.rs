//! The HTTP client wrapper.
//!
//! Every backend call goes through [`ApiClient::send`], which:
//! - attaches the stored access token (bearer transport) or the session
//!   cookie and its anti-forgery header (cookie transport)
//! - on a 401, refreshes the access token once and re-issues the request once
//! - hands every other failure back to the caller untouched

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, COOKIE, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::account::{AccountApi, TokenPair};
use crate::chat::ChatApi;
use crate::credentials::{
    CredentialChange, CredentialStore, Credentials, MemoryCredentialStore, keys,
};
use crate::endpoints;
use crate::error::ApiError;
use crate::receipts::ReceiptsApi;
use crate::request::{ApiRequest, RequestBody};
use tally_core::AuthMode;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for Tally.
const USER_AGENT: &str = concat!("Tally/", env!("CARGO_PKG_VERSION"));

/// Anti-forgery header expected by cookie-session deployments.
const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie carrying the anti-forgery token.
const CSRF_COOKIE: &str = "csrftoken";

// ============================================================================
// Transport
// ============================================================================

/// How credentials ride on requests. A deployment uses exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthTransport {
    /// `Authorization: Bearer <access token>` from the credential store.
    #[default]
    Bearer,
    /// A browser-style session cookie plus the `X-CSRFToken` header.
    CookieSession {
        /// Raw `Cookie` header value, e.g. `sessionid=...; csrftoken=...`.
        cookie: String,
    },
}

impl AuthTransport {
    /// Extracts the anti-forgery token from the session cookie.
    pub fn csrf_token(&self) -> Option<&str> {
        let Self::CookieSession { cookie } = self else {
            return None;
        };
        cookie.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == CSRF_COOKIE && !value.is_empty()).then_some(value)
        })
    }

    fn uses_bearer(&self) -> bool {
        matches!(self, Self::Bearer)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ApiClient`].
#[derive(Clone)]
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    transport: AuthTransport,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl ApiClientBuilder {
    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the credential transport.
    #[must_use]
    pub fn transport(mut self, transport: AuthTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the durable credential store.
    #[must_use]
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = normalize_base_url(&self.base_url)?;
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url,
                transport: self.transport,
                credentials: self
                    .credentials
                    .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
                refresh_lock: Mutex::new(()),
            }),
        })
    }
}

impl std::fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(format!("{raw}: not a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ============================================================================
// Client
// ============================================================================

struct Inner {
    http: Client,
    base_url: Url,
    transport: AuthTransport,
    credentials: Arc<dyn CredentialStore>,
    // Held while a refresh is in flight so concurrent 401s share one refresh.
    refresh_lock: Mutex<()>,
}

/// The request-issuing facility shared by every component. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("bearer", &self.inner.transport.uses_bearer())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Starts building a client for a backend base URL.
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transport: AuthTransport::Bearer,
            credentials: None,
        }
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The configured credential transport.
    pub fn transport(&self) -> &AuthTransport {
        &self.inner.transport
    }

    /// The durable credential store this client reads from.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    /// Account service.
    pub fn account(&self) -> AccountApi {
        AccountApi::new(self.clone())
    }

    /// Receipts and OCR service.
    pub fn receipts(&self) -> ReceiptsApi {
        ReceiptsApi::new(self.clone())
    }

    /// Assistant service.
    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.clone())
    }

    /// Resolves a path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    /// Issues a request, refreshing the access token once on a 401.
    ///
    /// Returns the successful response, or the error for the final response.
    /// A failed refresh clears the stored password-mode credentials and
    /// returns the original 401.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let token = self.access_token().await?;
        let response = self.dispatch(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || !request.allow_refresh
            || !self.inner.transport.uses_bearer()
        {
            return check(response).await;
        }

        let original = match check(response).await {
            Err(e) => e,
            Ok(response) => return Ok(response),
        };

        match self.recover(token.as_deref()).await {
            Ok(fresh) => {
                debug!("Retrying with renewed access token");
                let retry = self.dispatch(request, Some(&fresh)).await?;
                check(retry).await
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(original)
            }
        }
    }

    /// Issues a request and decodes the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Issues a request and discards the body.
    pub async fn send_discard(&self, request: &ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(drop)
    }

    /// GET and decode.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(&ApiRequest::get(path)).await
    }

    /// POST JSON and decode.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(&ApiRequest::post_json(path, body)?).await
    }

    async fn access_token(&self) -> Result<Option<String>, ApiError> {
        if !self.inner.transport.uses_bearer() {
            return Ok(None);
        }
        Ok(self.inner.credentials.get(keys::ACCESS_TOKEN).await?)
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = self.url(&request.path)?;
        let mut builder = self.inner.http.request(request.method.clone(), url);

        match &self.inner.transport {
            AuthTransport::Bearer => {
                if let Some(token) = token {
                    builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
                }
            }
            AuthTransport::CookieSession { cookie } => {
                let value = HeaderValue::from_str(cookie)
                    .map_err(|e| ApiError::InvalidUrl(format!("invalid session cookie: {e}")))?;
                builder = builder.header(COOKIE, value);
                if let Some(csrf) = self.inner.transport.csrf_token() {
                    builder = builder.header(CSRF_HEADER, csrf);
                }
            }
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { .. } => match request.body.to_form()? {
                Some(form) => builder.multipart(form),
                None => builder,
            },
        };

        let response = builder.send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Produces a usable access token after a 401, refreshing at most once.
    async fn recover(&self, sent: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let store = &self.inner.credentials;

        // Another request may have refreshed while this one was in flight.
        if let Some(stored) = store.get(keys::ACCESS_TOKEN).await? {
            if sent != Some(stored.as_str()) {
                debug!("Access token already renewed");
                return Ok(stored);
            }
        }

        let Some(refresh) = store.get(keys::REFRESH_TOKEN).await? else {
            self.clear_password_credentials().await;
            return Err(ApiError::NoRefreshToken);
        };

        match self.refresh_tokens(&refresh).await {
            Ok(pair) => {
                let mut changes = vec![CredentialChange::set(keys::ACCESS_TOKEN, pair.access.clone())];
                if let Some(rotated) = pair.refresh {
                    changes.push(CredentialChange::set(keys::REFRESH_TOKEN, rotated));
                }
                store.apply(&changes).await?;
                debug!("Access token renewed");
                Ok(pair.access)
            }
            Err(e) => {
                self.clear_password_credentials().await;
                Err(e)
            }
        }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Sent without credentials and never itself refreshed.
    pub(crate) async fn refresh_tokens(&self, refresh: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post_json(endpoints::TOKEN_REFRESH, &json!({ "refresh": refresh }))?
            .without_refresh();
        let response = self.dispatch(&request, None).await?;
        decode(check(response).await?).await
    }

    async fn clear_password_credentials(&self) {
        let changes = Credentials::clearing(AuthMode::Password);
        if let Err(e) = self.inner.credentials.apply(&changes).await {
            warn!(error = %e, "Failed to clear password credentials");
        }
    }
}

// ============================================================================
// Response Handling
// ============================================================================

/// Passes successful responses through; turns the rest into [`ApiError`].
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let payload = serde_json::from_str::<Value>(&text).ok();
    let message = match &payload {
        Some(value) => error_message(value),
        None => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    };

    debug!(%status, message = message.as_deref().unwrap_or(""), "Request failed");
    Err(ApiError::from_status(status, message, payload))
}

/// The human-readable message in an error body: `error`, then `detail`,
/// then `message`.
pub fn error_message(body: &Value) -> Option<String> {
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::builder("http://localhost:8000/backend").build().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/backend/");
        assert_eq!(
            client.url("/api/users/me/").unwrap().as_str(),
            "http://localhost:8000/backend/api/users/me/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::builder("not a url").build().unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_csrf_token_from_cookie() {
        let transport = AuthTransport::CookieSession {
            cookie: "sessionid=abc; csrftoken=xyz".to_string(),
        };
        assert_eq!(transport.csrf_token(), Some("xyz"));

        let transport = AuthTransport::CookieSession {
            cookie: "sessionid=abc".to_string(),
        };
        assert_eq!(transport.csrf_token(), None);
        assert_eq!(AuthTransport::Bearer.csrf_token(), None);
    }

    #[test]
    fn test_error_message_precedence() {
        assert_eq!(
            error_message(&json!({"detail": "d", "error": "e"})).as_deref(),
            Some("e")
        );
        assert_eq!(error_message(&json!({"detail": "d"})).as_deref(), Some("d"));
        assert_eq!(error_message(&json!({"username": ["taken"]})), None);
    }
}
