//! Client-side error normalization.
//!
//! Every failure - server rejection or transport fault - is reduced to one
//! shape carrying a kind, an optional HTTP status, and a human-readable
//! message, so calling code never inspects raw responses.

use reqwest::StatusCode;
use serde::Deserialize;

/// Classified failure kinds. The first six mirror the server's error types;
/// the last three are transport failures that carry no HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Duplicate,
    Validation,
    Server,
    Timeout,
    Aborted,
    Network,
}

/// Normalized client error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    /// HTTP status, absent for transport-level failures.
    pub status: Option<u16>,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, Some(401), message)
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, None, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

/// Server error body: `{"error": {"message", "type"}}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

fn kind_for_type(error_type: &str) -> Option<ErrorKind> {
    match error_type {
        "Unauthorized" | "IncorrectLogin" => Some(ErrorKind::Unauthorized),
        "Forbidden" => Some(ErrorKind::Forbidden),
        "NotFound" => Some(ErrorKind::NotFound),
        "Duplicate" => Some(ErrorKind::Duplicate),
        "BadRequest" => Some(ErrorKind::Validation),
        "Internal" | "Db" => Some(ErrorKind::Server),
        _ => None,
    }
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Duplicate,
        400 | 422 => ErrorKind::Validation,
        _ => ErrorKind::Server,
    }
}

/// Build a ClientError from a non-success response status and body.
pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> ClientError {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        let kind =
            kind_for_type(&parsed.error.error_type).unwrap_or_else(|| kind_for_status(status));
        return ClientError::new(kind, Some(status.as_u16()), parsed.error.message);
    }

    let message = match kind_for_status(status) {
        ErrorKind::Unauthorized => "Unauthorized, please log in again".to_string(),
        ErrorKind::Forbidden => "Insufficient permissions".to_string(),
        ErrorKind::NotFound => "Resource not found".to_string(),
        ErrorKind::Duplicate => "Resource already exists".to_string(),
        ErrorKind::Validation => "Invalid request".to_string(),
        _ => format!("Server error ({})", status.as_u16()),
    };
    ClientError::new(kind_for_status(status), Some(status.as_u16()), message)
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::new(ErrorKind::Timeout, None, "Request timed out")
        } else if err.is_connect() {
            ClientError::new(
                ErrorKind::Network,
                None,
                format!("Network unreachable: {}", err),
            )
        } else if err.is_body() || err.is_decode() {
            ClientError::new(
                ErrorKind::Aborted,
                None,
                format!("Request aborted: {}", err),
            )
        } else {
            ClientError::new(ErrorKind::Network, None, format!("Request failed: {}", err))
        }
    }
}
