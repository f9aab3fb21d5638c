#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gradebook::db::{Database, UserRole};
use gradebook::jwt::Claims;
use gradebook::rate_limit::RateLimitConfig;
use gradebook::{ServerConfig, create_app};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Signing secret shared between test apps and hand-forged tokens.
pub const TEST_SECRET: &[u8] = b"gradebook-test-secret-0123456789abcdef";

/// Build an app over a fresh in-memory database.
pub async fn test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        session_secs: 24 * 60 * 60,
        rate_limits: RateLimitConfig::relaxed(),
    };
    (create_app(config), db)
}

/// Spawn a real server on an ephemeral port for client-SDK tests.
pub struct TestServer {
    pub base_url: String,
    pub db: Database,
}

pub async fn spawn_server() -> TestServer {
    let (app, db) = test_app().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server died");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        db,
    }
}

/// Spawn an arbitrary router (e.g. a counting stub) on an ephemeral port.
pub async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub server died");
    });

    format!("http://{}", addr)
}

/// Send one request through the router and return (status, parsed body).
pub async fn send_json(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register an account and return the created user JSON.
pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Value {
    let (status, body) = send_json(
        app,
        "POST",
        "/users/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": password,
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {}", body);
    body
}

/// Log in and return the session token and user JSON.
pub async fn login(app: &Router, username_or_email: &str, password: &str) -> (String, Value) {
    let (status, body) = send_json(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({
            "username_or_email": username_or_email,
            "password": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    let token = body["token"].as_str().expect("missing token").to_string();
    (token, body["user"].clone())
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Hand-encode a token with chosen timestamps, signed with `secret`.
pub fn forge_token(
    secret: &[u8],
    sub: &str,
    username: &str,
    role: UserRole,
    iat: u64,
    exp: u64,
) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        username: username.to_string(),
        role,
        iat,
        exp,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("Failed to encode token")
}

/// The `type` field of a structured error body.
pub fn error_type(body: &Value) -> &str {
    body["error"]["type"].as_str().unwrap_or("")
}
