//! Integration tests for the authenticated request pipeline: bearer
//! attachment, coordinated refresh, replay, and session teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinica_auth::{CredentialPair, CredentialStore, MemoryCredentialStore, StoreScope};
use clinica_client::{ApiRequest, ClinicaClient};

fn store_with(access: &str, refresh: &str) -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::new());
    store
        .set_pair(&CredentialPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        })
        .unwrap();
    store
}

fn client_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> ClinicaClient {
    ClinicaClient::builder()
        .base_url(server.uri())
        .credential_store(store)
        .build()
        .unwrap()
}

async fn mount_refresh(server: &MockServer, refresh: &str, access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .and(body_json(json!({ "refresh": refresh })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": access })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn refresh_replays_request_with_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/5/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", "A2", 1).await;
    Mock::given(method("GET"))
        .and(path("/usuarios/5/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "username": "ana", "email": "ana@clinica.test"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    let invalidated = Arc::new(AtomicUsize::new(0));
    let hook_count = Arc::clone(&invalidated);
    let client = ClinicaClient::builder()
        .base_url(server.uri())
        .credential_store(Arc::clone(&store) as Arc<dyn CredentialStore>)
        .on_session_invalidated(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let response = client.send(ApiRequest::get("usuarios/5/")).await.unwrap();
    let user: serde_json::Value = response.json().await.unwrap();

    assert_eq!(user["username"], "ana");
    assert_eq!(store.access_token().as_deref(), Some("A2"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    assert_eq!(invalidated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_failures_share_one_refresh() {
    let server = MockServer::start().await;

    for resource in ["/usuarios/", "/odontologos/", "/pacientes/"] {
        Mock::given(method("GET"))
            .and(path(resource))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(resource))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
    }

    // The delay keeps the exchange in flight while all three 401s arrive.
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    let client = client_for(&server, Arc::clone(&store));

    let (a, b, c) = tokio::join!(
        client.send(ApiRequest::get("usuarios/")),
        client.send(ApiRequest::get("odontologos/")),
        client.send(ApiRequest::get("pacientes/")),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(store.access_token().as_deref(), Some("A2"));
}

#[tokio::test]
async fn replayed_request_rejected_again_is_final() {
    let server = MockServer::start().await;

    // 401 regardless of which token is presented.
    Mock::given(method("GET"))
        .and(path("/usuarios/5/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "No pasa"})))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", "A2", 1).await;

    let store = store_with("A1", "R1");
    let client = client_for(&server, store);

    let error = client
        .send(ApiRequest::get("usuarios/5/"))
        .await
        .unwrap_err();
    assert!(error.is_auth_error());
}

#[tokio::test]
async fn missing_refresh_token_tears_down_without_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.set_access_token("A1").unwrap();
    store.set_cached_user(json!({"id": 1})).unwrap();

    let invalidated = Arc::new(AtomicUsize::new(0));
    let hook_count = Arc::clone(&invalidated);
    let client = ClinicaClient::builder()
        .base_url(server.uri())
        .credential_store(Arc::clone(&store) as Arc<dyn CredentialStore>)
        .on_session_invalidated(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let error = client.send(ApiRequest::get("usuarios/")).await.unwrap_err();

    assert!(error.is_auth_error());
    assert!(store.access_token().is_none());
    assert!(store.cached_user().is_none());
    assert_eq!(invalidated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_exchange_tears_down_and_surfaces_original_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/5/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Token is invalid or expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    store.set_cached_user(json!({"id": 1, "username": "ana"})).unwrap();

    let invalidated = Arc::new(AtomicUsize::new(0));
    let hook_count = Arc::clone(&invalidated);
    let client = ClinicaClient::builder()
        .base_url(server.uri())
        .credential_store(Arc::clone(&store) as Arc<dyn CredentialStore>)
        .on_session_invalidated(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let error = client
        .send(ApiRequest::get("usuarios/5/"))
        .await
        .unwrap_err();

    // The caller sees the original 401, not a refresh-specific error.
    assert!(error.is_auth_error());
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
    assert!(store.cached_user().is_none());
    assert_eq!(invalidated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn successful_refresh_updates_default_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", "A2", 1).await;

    // An unrelated later request must carry the refreshed token.
    Mock::given(method("GET"))
        .and(path("/pacientes/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    let client = client_for(&server, store);

    client.send(ApiRequest::get("usuarios/")).await.unwrap();
    client.send(ApiRequest::get("pacientes/")).await.unwrap();
}

#[tokio::test]
async fn non_auth_failures_pass_through_without_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    let client = client_for(&server, Arc::clone(&store));

    let error = client.send(ApiRequest::get("usuarios/")).await.unwrap_err();
    assert!(error.is_server_error());
    assert_eq!(store.access_token().as_deref(), Some("A1"));
}

#[tokio::test]
async fn transport_errors_propagate_without_refresh_or_teardown() {
    let store = store_with("A1", "R1");
    let invalidated = Arc::new(AtomicUsize::new(0));
    let hook_count = Arc::clone(&invalidated);

    // Nothing listens here; the dispatch itself fails.
    let client = ClinicaClient::builder()
        .base_url("http://127.0.0.1:1/")
        .credential_store(Arc::clone(&store) as Arc<dyn CredentialStore>)
        .on_session_invalidated(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let error = client.send(ApiRequest::get("usuarios/")).await.unwrap_err();

    assert!(matches!(error, clinica_client::Error::Http(_)));
    assert_eq!(store.access_token().as_deref(), Some("A1"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    assert_eq!(invalidated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stored_token_overrides_caller_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("A1", "R1");
    let client = client_for(&server, store);

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Bearer stale"),
    );
    client
        .send(ApiRequest::get("usuarios/").with_headers(headers))
        .await
        .unwrap();

    // The stored token replaces the caller's value; exactly one
    // Authorization header goes out on the wire.
    let requests = server.received_requests().await.unwrap();
    let sent: Vec<_> = requests[0]
        .headers
        .get_all("Authorization")
        .iter()
        .map(|value| value.to_str().unwrap())
        .collect();
    assert_eq!(sent, ["Bearer A1"]);
}

#[tokio::test]
async fn session_scope_never_touches_the_durable_file() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/token/"))
        .and(body_json(json!({"username": "admin", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClinicaClient::builder()
        .base_url(server.uri())
        .storage(StoreScope::Session)
        .data_dir(temp.path())
        .build()
        .unwrap();

    client.auth().login("admin", "secret").await.unwrap();
    client.send(ApiRequest::get("usuarios/")).await.unwrap();

    // The session scope lives in memory only.
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}
