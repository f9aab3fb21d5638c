//! User registration, login and profile endpoints.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Database, NewUser, User, UserRole};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limits: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            rate_limit_register,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            rate_limit_login,
        ));

    let me_router = Router::new().route("/me", get(me)).with_state(state);

    Router::new()
        .merge(register_router)
        .merge(login_router)
        .merge(me_router)
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    display_name: Option<String>,
    bio: Option<String>,
    role: Option<String>,
    grade: Option<i64>,
    parent_name: Option<String>,
    parent_phone: Option<String>,
    address: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    username_or_email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::bad_request("Username cannot contain whitespace"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }

    let role = match payload.role.as_deref() {
        None | Some("student") => UserRole::Student,
        Some("teacher") => UserRole::Teacher,
        Some(other) => {
            return Err(ApiError::bad_request(format!("Unknown role: {}", other)));
        }
    };

    if state
        .db
        .users()
        .username_exists(&username)
        .await
        .db_err("Failed to check username")?
    {
        return Err(ApiError::duplicate("Username is already taken"));
    }
    if state
        .db
        .users()
        .email_exists(&email)
        .await
        .db_err("Failed to check email")?
    {
        return Err(ApiError::duplicate("Email is already registered"));
    }

    // bcrypt is deliberately slow; keep it off the async workers.
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        bcrypt::hash(&password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|_| ApiError::internal("Password hashing task failed"))?
    .map_err(|_| ApiError::internal("Failed to hash password"))?;

    let user = state
        .db
        .users()
        .create(NewUser {
            uuid: uuid::Uuid::new_v4().to_string(),
            username: username.clone(),
            email,
            password_hash,
            display_name: payload.display_name,
            bio: payload.bio,
            role,
            grade: payload.grade,
            parent_name: payload.parent_name,
            parent_phone: payload.parent_phone,
            address: payload.address,
            notes: payload.notes,
        })
        .await
        .db_err("Failed to create user")?;

    info!(username = %username, role = %role.as_str(), "User registered");
    Ok(Json(user))
}

async fn login(
    State(state): State<UsersState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let identifier = payload.username_or_email.trim().to_string();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(
            "Username/email and password are required",
        ));
    }

    let user = state
        .db
        .users()
        .get_by_username_or_email(&identifier)
        .await
        .db_err("Failed to look up user")?;

    // Unknown account and wrong password take the same exit.
    let Some(user) = user else {
        warn!(identifier = %identifier, "Login attempt for unknown account");
        return Err(ApiError::incorrect_login());
    };

    let password = payload.password;
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .map_err(|_| ApiError::internal("Password verification task failed"))?
        .map_err(|_| ApiError::internal("Failed to verify password"))?;

    if !matches {
        warn!(username = %user.username, "Login attempt with wrong password");
        return Err(ApiError::incorrect_login());
    }

    let issued = state
        .jwt
        .issue(&user.uuid, &user.username, user.role)
        .map_err(|e| {
            tracing::error!("Failed to issue token: {}", e);
            ApiError::internal("Failed to issue token")
        })?;

    info!(username = %user.username, "Login successful");
    Ok(Json(LoginResponse {
        token: issued.token,
        user,
    }))
}

async fn me(State(state): State<UsersState>, Auth(user): Auth) -> Result<Json<User>, ApiError> {
    let record = state
        .db
        .users()
        .get_by_uuid(user.uuid())
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User no longer exists"))?;
    Ok(Json(record))
}
