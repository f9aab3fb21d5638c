//! End-to-end tests for the client request pipeline: proactive refresh,
//! reactive refresh-and-replay, the single-retry ceiling, and transport
//! error normalization. These drive the real server over TCP with the
//! crate's own client SDK.

mod common;

use axum::http::StatusCode as AxumStatus;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{TEST_SECRET, forge_token, spawn_router, spawn_server, unix_now};
use gradebook::client::{ApiClient, ErrorKind, MemorySessionStore, SessionStore, decode_expiry};
use gradebook::db::UserRole;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Build a client over a fresh in-memory store.
fn client_for(base_url: &str) -> (ApiClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let client = ApiClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(10))
        .store(store.clone())
        .build()
        .expect("Failed to build client");
    (client, store)
}

/// Register and log in a student through the SDK.
/// Returns the client, its store, and the student's uuid.
async fn logged_in_client(base_url: &str) -> (ApiClient, Arc<MemorySessionStore>, String) {
    let (client, store) = client_for(base_url);
    client
        .register(&json!({
            "username": "stud",
            "email": "stud@example.com",
            "password": "secret123",
            "role": "student",
        }))
        .await
        .expect("register failed");
    let record = client
        .login("stud", "secret123")
        .await
        .expect("login failed");
    let uuid = record.user.uuid.clone();
    (client, store, uuid)
}

#[tokio::test]
async fn test_login_persists_session_and_authenticates_requests() {
    let server = spawn_server().await;
    let (client, store, _) = logged_in_client(&server.base_url).await;

    let session = store.load().await.unwrap().expect("no session stored");
    assert_eq!(session.user.username, "stud");
    assert_eq!(session.user.role, "student");

    let me = client.get("/users/me").await.unwrap();
    assert_eq!(me["username"], "stud");
}

#[tokio::test]
async fn test_login_failure_stores_nothing() {
    let server = spawn_server().await;
    let (client, store) = client_for(&server.base_url);

    let err = client.login("nobody", "wrong").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.status, Some(401));
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_duplicate_surfaces_duplicate_kind() {
    let server = spawn_server().await;
    let (client, _, _) = logged_in_client(&server.base_url).await;

    let err = client
        .register(&json!({
            "username": "stud2",
            "email": "stud@example.com",
            "password": "secret123",
        }))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicate);
    assert_eq!(err.status, Some(409));
}

/// Scenario: the stored token expires in 10 minutes, inside the 30-minute
/// pre-expiry window. The pipeline refreshes before sending; the request
/// succeeds and the store ends up holding the replacement token.
#[tokio::test]
async fn test_proactive_refresh_before_expiry() {
    let server = spawn_server().await;
    let (client, store, uuid) = logged_in_client(&server.base_url).await;

    let now = unix_now();
    let nearing = forge_token(TEST_SECRET, &uuid, "stud", UserRole::Student, now, now + 600);
    store.set_token(nearing.clone()).await.unwrap();

    let me = client.get("/users/me").await.unwrap();
    assert_eq!(me["uuid"], uuid.as_str());

    let session = store.load().await.unwrap().unwrap();
    assert_ne!(session.token, nearing, "token was not refreshed");
    let new_exp = decode_expiry(&session.token).unwrap();
    assert!(new_exp > now + 600, "replacement token should expire later");
    // The snapshot survived the token swap
    assert_eq!(session.user.uuid, uuid);
}

/// Scenario: the stored token expired 5 minutes ago, inside the grace
/// window. The first send comes back 401; the pipeline refreshes, replays
/// once, and the caller sees only the successful response.
#[tokio::test]
async fn test_reactive_refresh_and_replay_after_401() {
    let server = spawn_server().await;
    let (client, store, uuid) = logged_in_client(&server.base_url).await;

    let now = unix_now();
    let in_grace = forge_token(
        TEST_SECRET,
        &uuid,
        "stud",
        UserRole::Student,
        now - 600,
        now - 300,
    );
    store.set_token(in_grace.clone()).await.unwrap();

    // The caller never observes the intermediate 401
    let me = client.get("/users/me").await.unwrap();
    assert_eq!(me["uuid"], uuid.as_str());

    let session = store.load().await.unwrap().unwrap();
    assert_ne!(session.token, in_grace);
    assert!(decode_expiry(&session.token).unwrap() > now);
}

/// Scenario: the stored token expired two hours ago, beyond grace. The
/// refresh attempt is rejected by the server, the 401 surfaces to the
/// caller, and the dead session is cleared.
#[tokio::test]
async fn test_dead_token_surfaces_unauthorized_and_clears_session() {
    let server = spawn_server().await;
    let (client, store, uuid) = logged_in_client(&server.base_url).await;

    let now = unix_now();
    let dead = forge_token(
        TEST_SECRET,
        &uuid,
        "stud",
        UserRole::Student,
        now - 10_000,
        now - 7200,
    );
    store.set_token(dead).await.unwrap();

    let err = client.get("/users/me").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.status, Some(401));
    assert!(
        store.load().await.unwrap().is_none(),
        "unsalvageable session should be cleared"
    );
}

/// A counting stub whose resource route always rejects and whose refresh
/// route always succeeds. However often the client is provoked, the
/// original request goes out exactly twice: once, plus one flagged replay.
#[tokio::test]
async fn test_never_more_than_one_retry() {
    let resource_hits = Arc::new(AtomicUsize::new(0));
    let refresh_hits = Arc::new(AtomicUsize::new(0));

    let unauthorized_body = || {
        (
            AxumStatus::UNAUTHORIZED,
            Json(json!({"error": {"message": "Token has expired", "type": "Unauthorized"}})),
        )
    };

    let app = Router::new()
        .route(
            "/things",
            get({
                let resource_hits = resource_hits.clone();
                move || {
                    let resource_hits = resource_hits.clone();
                    async move {
                        resource_hits.fetch_add(1, Ordering::SeqCst);
                        unauthorized_body()
                    }
                }
            }),
        )
        .route(
            "/auth/refresh",
            post({
                let refresh_hits = refresh_hits.clone();
                move || {
                    let refresh_hits = refresh_hits.clone();
                    async move {
                        refresh_hits.fetch_add(1, Ordering::SeqCst);
                        Json(json!({"token": "replacement-token"}))
                    }
                }
            }),
        );
    let base_url = spawn_router(app).await;

    let (client, store) = client_for(&base_url);
    let now = unix_now();
    // Seed an in-grace token so the pipeline attaches it without a
    // proactive refresh.
    let in_grace = forge_token(
        TEST_SECRET,
        "uuid-1",
        "stud",
        UserRole::Student,
        now - 600,
        now - 300,
    );
    seed_session(&store, in_grace).await;

    let err = client.get("/things").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    assert_eq!(resource_hits.load(Ordering::SeqCst), 2, "one send plus one replay");
    assert_eq!(refresh_hits.load(Ordering::SeqCst), 1, "exactly one reactive refresh");
}

/// A nearing-expiry token whose proactive refresh fails must not block the
/// request: the old, still-valid token goes out and the response comes back.
#[tokio::test]
async fn test_failed_proactive_refresh_is_not_fatal() {
    let refresh_hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/things", get(|| async { Json(json!({"ok": true})) }))
        .route(
            "/auth/refresh",
            post({
                let refresh_hits = refresh_hits.clone();
                move || {
                    let refresh_hits = refresh_hits.clone();
                    async move {
                        refresh_hits.fetch_add(1, Ordering::SeqCst);
                        (
                            AxumStatus::INTERNAL_SERVER_ERROR,
                            Json(json!({"error": {"message": "boom", "type": "Internal"}})),
                        )
                    }
                }
            }),
        );
    let base_url = spawn_router(app).await;

    let (client, store) = client_for(&base_url);
    let now = unix_now();
    let nearing = forge_token(TEST_SECRET, "uuid-1", "stud", UserRole::Student, now, now + 600);
    seed_session(&store, nearing.clone()).await;

    let response = client.get("/things").await.unwrap();
    assert_eq!(response["ok"], true);
    assert_eq!(refresh_hits.load(Ordering::SeqCst), 1);
    // The old token is still in place
    assert_eq!(store.load().await.unwrap().unwrap().token, nearing);
}

/// With no stored session the pipeline sends no Authorization header.
#[tokio::test]
async fn test_no_session_sends_no_header() {
    let app = Router::new().route(
        "/echo",
        get(|headers: axum::http::HeaderMap| async move {
            Json(json!({"has_auth": headers.contains_key("authorization")}))
        }),
    );
    let base_url = spawn_router(app).await;

    let (client, _) = client_for(&base_url);
    let response = client.get("/echo").await.unwrap();
    assert_eq!(response["has_auth"], false);
}

#[tokio::test]
async fn test_transport_errors_are_normalized() {
    // Connection refused: bind a port, then drop the listener
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, _) = client_for(&format!("http://{}", addr));
    let err = client.get("/users/me").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert!(err.status.is_none());

    // Timeout: a route that outlives the client's deadline
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({}))
        }),
    );
    let base_url = spawn_router(app).await;
    let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
    let client = ApiClient::builder()
        .base_url(&base_url)
        .timeout(Duration::from_millis(300))
        .store(store)
        .build()
        .unwrap();
    let err = client.get("/slow").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.status.is_none());
}

/// Concurrent requests may each trigger their own proactive refresh; the
/// race is benign and every request succeeds.
#[tokio::test]
async fn test_concurrent_requests_tolerate_refresh_race() {
    let server = spawn_server().await;
    let (client, store, uuid) = logged_in_client(&server.base_url).await;

    let now = unix_now();
    let nearing = forge_token(TEST_SECRET, &uuid, "stud", UserRole::Student, now, now + 600);
    store.set_token(nearing).await.unwrap();

    let results = futures::future::join_all(
        (0..5).map(|_| {
            let client = client.clone();
            async move { client.get("/users/me").await }
        }),
    )
    .await;

    for result in results {
        let me = result.expect("concurrent request failed");
        assert_eq!(me["uuid"], uuid.as_str());
    }

    // Whichever refresh landed last, the stored session is intact and valid
    let session = store.load().await.unwrap().unwrap();
    assert_eq!(session.user.uuid, uuid);
    assert!(decode_expiry(&session.token).unwrap() > now);
}

/// Logout clears the persisted session and subsequent requests go out bare.
#[tokio::test]
async fn test_logout_clears_session() {
    let server = spawn_server().await;
    let (client, store, _) = logged_in_client(&server.base_url).await;

    client.logout().await.unwrap();
    assert!(store.load().await.unwrap().is_none());

    let err = client.get("/users/me").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

/// Seed a session record directly (what a prior login would have
/// persisted), used by the stub-router tests where no real login exists.
async fn seed_session(store: &Arc<MemorySessionStore>, token: String) {
    use gradebook::client::{SessionRecord, UserSnapshot};
    store
        .save(SessionRecord {
            token,
            user: UserSnapshot {
                uuid: "uuid-1".to_string(),
                username: "stud".to_string(),
                email: "stud@example.com".to_string(),
                role: "student".to_string(),
                display_name: None,
                extra: serde_json::Map::new(),
            },
        })
        .await
        .unwrap();
}
