//! Shared error handling for API endpoints.
//!
//! Every error response carries the body `{"error": {"message", "type"}}`
//! so clients can normalize failures without sniffing status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Closed set of error types exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Duplicate,
    IncorrectLogin,
    Internal,
    Db,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "BadRequest",
            ErrorType::Unauthorized => "Unauthorized",
            ErrorType::Forbidden => "Forbidden",
            ErrorType::NotFound => "NotFound",
            ErrorType::Duplicate => "Duplicate",
            ErrorType::IncorrectLogin => "IncorrectLogin",
            ErrorType::Internal => "Internal",
            ErrorType::Db => "Db",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized | ErrorType::IncorrectLogin => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Duplicate => StatusCode::CONFLICT,
            ErrorType::Internal | ErrorType::Db => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error with automatic response conversion.
#[derive(Debug)]
pub struct ApiError {
    etype: ErrorType,
    message: String,
}

impl ApiError {
    pub fn new(etype: ErrorType, message: impl Into<String>) -> Self {
        Self {
            etype,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::BadRequest, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::Unauthorized, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::Forbidden, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::NotFound, msg)
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::Duplicate, msg)
    }

    pub fn incorrect_login() -> Self {
        // One message for unknown accounts and wrong passwords alike, so the
        // response cannot be used to enumerate accounts.
        Self::new(ErrorType::IncorrectLogin, "Incorrect username or password")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorType::Internal, msg)
    }

    pub fn error_type(&self) -> ErrorType {
        self.etype
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::new(ErrorType::NotFound, "Record not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::new(ErrorType::Duplicate, "Record already exists")
            }
            _ => {
                error!("Database error: {}", err);
                Self::new(ErrorType::Db, "Database error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "type": self.etype.as_str(),
            }
        });
        (self.etype.status_code(), Json(body)).into_response()
    }
}

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            let mapped = ApiError::from(e);
            if mapped.error_type() == ErrorType::Db {
                error!("{}", msg);
            }
            mapped
        })
    }
}
