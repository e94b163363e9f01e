//! Session manager flows against a mock account service.

use std::sync::Arc;

use serde_json::json;
use tally_core::{AuthMethod, AuthMode, Identity};
use tally_fetch::{ApiClient, CredentialStore, MemoryCredentialStore, Registration, keys};
use tally_store::{Access, Route, SessionManager, SessionState};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager(server: &MockServer, store: Arc<MemoryCredentialStore>) -> SessionManager {
    let client = ApiClient::builder(server.uri())
        .credentials(store)
        .build()
        .unwrap();
    SessionManager::new(client)
}

fn wallet_identity() -> Identity {
    Identity::new("did:wallet:42", "Wally", AuthMethod::Wallet)
        .with_email("wally@example.com")
        .with_wallet_address("0xabc")
}

async fn mount_me(server: &MockServer, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({"id": 5, "username": "ada", "first_name": "Ada"})),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_password_login_stores_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .and(body_json(json!({"username": "ada", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "acc-1",
            "refresh": "ref-1",
            "id": 5,
            "username": "ada"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_values([
        (keys::WALLET_TOKEN, "old-wallet"),
        (keys::WALLET_IDENTITY, "{}"),
    ]));
    let session = manager(&server, store.clone());

    let identity = session.login_with_password("ada", "pw").await.unwrap();
    assert_eq!(identity.mode(), AuthMode::Password);
    assert!(session.is_authenticated());
    assert_eq!(store.get(keys::ACCESS_TOKEN).await.unwrap().as_deref(), Some("acc-1"));
    assert_eq!(store.get(keys::REFRESH_TOKEN).await.unwrap().as_deref(), Some("ref-1"));
    assert!(store.get(keys::WALLET_TOKEN).await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_failure_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let failure = session.login_with_password("ada", "nope").await.unwrap_err();
    assert_eq!(failure.message, "Invalid credentials");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_failure_without_message_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let failure = session.login_with_password("ada", "pw").await.unwrap_err();
    assert_eq!(failure.message, "Login failed");
}

#[tokio::test]
async fn test_register_failure_carries_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/register/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "username": ["A user with that username already exists."]
        })))
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let failure = session
        .register(&Registration::new("ada", "ada@example.com", "pw"))
        .await
        .unwrap_err();

    assert!(failure.message.starts_with("username: "));
    assert!(failure.details.unwrap().get("username").is_some());
}

#[tokio::test]
async fn test_register_success_signs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/register/"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 9, "username": "grace", "email": "g@example.com"})),
        )
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let identity = session
        .register(&Registration::new("grace", "g@example.com", "pw"))
        .await
        .unwrap();
    assert_eq!(identity.name, "grace");
    assert_eq!(session.identity().unwrap().id, "9");
}

#[tokio::test]
async fn test_password_logout_clears_tokens_even_if_request_fails() {
    let server = MockServer::start().await;
    mount_me(&server, 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_values([
        (keys::ACCESS_TOKEN, "acc"),
        (keys::REFRESH_TOKEN, "ref"),
    ]));
    let session = manager(&server, store.clone());
    assert!(session.initialize().await.is_authenticated());

    session.logout().await;

    assert!(!session.is_authenticated());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(store.get(keys::ACCESS_TOKEN).await.unwrap().is_none());
    assert!(store.get(keys::REFRESH_TOKEN).await.unwrap().is_none());
}

#[tokio::test]
async fn test_wallet_session_restored_without_account_service() {
    let server = MockServer::start().await;
    mount_me(&server, 200, 0).await;

    let store = Arc::new(MemoryCredentialStore::new());

    let first = manager(&server, store.clone());
    first
        .login_with_identity_wallet(wallet_identity(), "wallet-token")
        .await
        .unwrap();

    let raw = store.get(keys::WALLET_IDENTITY).await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["authMethod"], "wallet");

    // A fresh process over the same storage.
    let second = manager(&server, store);
    let state = second.initialize().await;
    assert_eq!(state, SessionState::Authenticated(wallet_identity()));
}

#[tokio::test]
async fn test_wallet_logout_skips_account_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = manager(&server, store.clone());
    session
        .login_with_identity_wallet(wallet_identity(), "wallet-token")
        .await
        .unwrap();

    session.logout().await;

    assert!(!session.is_authenticated());
    assert!(store.get(keys::WALLET_TOKEN).await.unwrap().is_none());
    assert!(store.get(keys::WALLET_IDENTITY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_wallet_identity_in_wallet_slot_is_not_restored() {
    let server = MockServer::start().await;
    mount_me(&server, 401, 2).await;

    let forged = Identity::new("5", "Ada", AuthMethod::Password);
    let store = Arc::new(MemoryCredentialStore::with_values([
        (keys::WALLET_TOKEN, "t".to_string()),
        (keys::WALLET_IDENTITY, serde_json::to_string(&forged).unwrap()),
    ]));

    let first = manager(&server, store.clone());
    assert_eq!(first.initialize().await, SessionState::Anonymous);
    first.logout().await;

    let second = manager(&server, store);
    assert_eq!(second.initialize().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_logout_clears_the_stored_mode() {
    let server = MockServer::start().await;
    mount_me(&server, 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let stale = manager(&server, store.clone());
    assert!(stale.initialize().await.is_authenticated());

    // Another process switches to the wallet meanwhile.
    manager(&server, store.clone())
        .login_with_identity_wallet(wallet_identity(), "wallet-token")
        .await
        .unwrap();

    stale.logout().await;

    assert_eq!(stale.state(), SessionState::Anonymous);
    assert!(store.get(keys::WALLET_TOKEN).await.unwrap().is_none());
    assert!(store.get(keys::WALLET_IDENTITY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_wallet_login_rejects_password_identity() {
    let server = MockServer::start().await;
    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));

    let identity = Identity::new("1", "Ada", AuthMethod::Password);
    assert!(session.login_with_identity_wallet(identity, "t").await.is_err());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let server = MockServer::start().await;
    mount_me(&server, 401, 2).await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let first = session.initialize().await;
    let second = session.initialize().await;
    assert_eq!(first, SessionState::Anonymous);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_route_guard() {
    let server = MockServer::start().await;
    mount_me(&server, 401, 1).await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    assert_eq!(session.guard(Route::Upload), Access::Pending);
    assert_eq!(session.guard(Route::Auth), Access::Allow);

    let mut rx = session.subscribe();
    session.initialize().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);

    assert_eq!(session.guard(Route::Upload), Access::RedirectToLogin);
    assert_eq!(session.guard(Route::NotFound), Access::Allow);
}
