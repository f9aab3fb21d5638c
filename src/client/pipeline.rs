//! The authenticated request pipeline.
//!
//! Runs once per outbound call: attach the stored token, refresh it
//! proactively when it is about to expire, and after a 401 attempt one
//! reactive refresh followed by a single flagged replay of the original
//! request. Signature failures and every other error kind pass straight
//! through; only expiry is ever recovered.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use url::Url;

use super::error::{self, ClientError, ErrorKind};
use super::session::{MemorySessionStore, SessionRecord, SessionStore, UserSnapshot};
use super::token::{TokenState, classify_token};

const REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client wrapping every request in the session-aware pipeline.
///
/// Cheap to clone; concurrent calls are independent. Two calls may both
/// notice a token nearing expiry and both refresh; the store keeps whichever
/// token lands last and either token satisfies the server.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// The injected session store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// The currently persisted session, if any.
    pub async fn current_session(&self) -> Result<Option<SessionRecord>, ClientError> {
        self.store.load().await
    }

    /// Authenticate and persist the resulting session.
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<SessionRecord, ClientError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username_or_email: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
            user: UserSnapshot,
        }

        let resp = self
            .http
            .post(self.url("/users/login"))
            .json(&LoginRequest {
                username_or_email,
                password,
            })
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ClientError::from)?;
        if !status.is_success() {
            return Err(error::from_response(status, &bytes));
        }

        let parsed: LoginResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::new(
                ErrorKind::Aborted,
                Some(status.as_u16()),
                format!("Malformed login response: {}", e),
            )
        })?;

        let record = SessionRecord {
            token: parsed.token,
            user: parsed.user,
        };
        self.store.save(record.clone()).await?;
        Ok(record)
    }

    /// Create an account. Public endpoint; no token is attached.
    pub async fn register<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, ClientError> {
        let resp = self
            .http
            .post(self.url("/users/register"))
            .json(payload)
            .send()
            .await
            .map_err(ClientError::from)?;
        Self::read_json(resp).await
    }

    /// Drop the persisted session. Stateless tokens need no server call.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.clear().await
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(Method::GET, path, None, false).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let body = to_value(body)?;
        self.execute(Method::POST, path, Some(body), false).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let body = to_value(body)?;
        self.execute(Method::PUT, path, Some(body), false).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(Method::DELETE, path, None, false).await
    }

    /// The per-request state machine. `retried` marks a replay; a replayed
    /// request is never replayed again.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        retried: bool,
    ) -> Result<Value, ClientError> {
        let token = if retried {
            // The replay carries exactly the token the reactive refresh
            // persisted; no further proactive checks.
            self.store.load().await?.map(|record| record.token)
        } else {
            self.prepare_token().await?
        };

        let resp = self
            .send_once(method.clone(), path, body.as_ref(), token.as_deref())
            .await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED && path != REFRESH_PATH {
            let bytes = resp.bytes().await.map_err(ClientError::from)?;
            let err = error::from_response(status, &bytes);

            if retried {
                // Second rejection: the session is beyond saving here.
                let _ = self.store.clear().await;
                return Err(err);
            }

            return match self.reactive_refresh().await {
                Ok(true) => Box::pin(self.execute(method, path, body, true)).await,
                Ok(false) => Err(err),
                Err(refresh_err) => {
                    debug!("Reactive refresh failed: {}", refresh_err);
                    let _ = self.store.clear().await;
                    Err(err)
                }
            };
        }

        Self::read_json(resp).await
    }

    /// Decide which token accompanies an outgoing request, refreshing
    /// proactively when expiry is near. A failed proactive refresh is not
    /// fatal; the still-valid token goes out and the next call tries again.
    async fn prepare_token(&self) -> Result<Option<String>, ClientError> {
        let Some(record) = self.store.load().await? else {
            return Ok(None);
        };

        if classify_token(&record.token, unix_now()) == Some(TokenState::NearingExpiry) {
            match self.call_refresh(&record.token).await {
                Ok(new_token) => {
                    self.store.set_token(new_token.clone()).await?;
                    debug!("Proactively refreshed session token");
                    return Ok(Some(new_token));
                }
                Err(e) => {
                    warn!("Proactive token refresh failed: {}", e);
                }
            }
        }

        // Fresh tokens go out as-is; expired ones go out too and the
        // server's rejection drives recovery.
        Ok(Some(record.token))
    }

    /// One reactive refresh attempt after a 401. Returns false when there is
    /// no stored session to refresh.
    async fn reactive_refresh(&self) -> Result<bool, ClientError> {
        let Some(record) = self.store.load().await? else {
            return Ok(false);
        };
        let new_token = self.call_refresh(&record.token).await?;
        self.store.set_token(new_token).await?;
        Ok(true)
    }

    async fn call_refresh(&self, token: &str) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct RefreshResponse {
            token: String,
        }

        let resp = self
            .http
            .post(self.url(REFRESH_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ClientError::from)?;
        if !status.is_success() {
            return Err(error::from_response(status, &bytes));
        }

        let parsed: RefreshResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::new(
                ErrorKind::Aborted,
                Some(status.as_u16()),
                format!("Malformed refresh response: {}", e),
            )
        })?;
        Ok(parsed.token)
    }

    // Requests cannot be cloned once built, so each attempt builds afresh.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(ClientError::from)
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ClientError::from)?;
        if !status.is_success() {
            return Err(error::from_response(status, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::new(
                ErrorKind::Aborted,
                Some(status.as_u16()),
                format!("Malformed response body: {}", e),
            )
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn to_value<B: Serialize + ?Sized>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::new(ErrorKind::Validation, None, format!("Unencodable body: {}", e)))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Builder for [`ApiClient`] instances.
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    store: Option<Arc<dyn SessionStore>>,
}

impl ApiClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            store: None,
        }
    }

    /// Server base URL, e.g. `http://localhost:7080`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Bound for every request, refresh calls included. Defaults to 10s.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Inject a session store. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self.base_url.ok_or_else(|| {
            ClientError::new(ErrorKind::Validation, None, "base_url is required")
        })?;
        Url::parse(&base_url).map_err(|e| {
            ClientError::new(
                ErrorKind::Validation,
                None,
                format!("Invalid base_url: {}", e),
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ClientError::from)?;

        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
        })
    }
}
