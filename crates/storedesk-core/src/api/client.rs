//! API client for the back-office REST backend.
//!
//! Every call goes through [`ApiClient::send`], which attaches the bearer
//! token, unwraps the response body, and on a 401 refreshes the access token
//! once and replays the request.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::refresh::{RefreshCoordinator, RefreshOutcome};
use super::request::RequestDescriptor;
use super::ApiError;
use crate::auth::{Session, SessionManager};
use crate::models::ApiEnvelope;

// ============================================================================
// Constants
// ============================================================================

/// Default backend base URL (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:7000/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/employees/auth/login";
const REFRESH_PATH: &str = "/employees/auth/refresh-token";

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL all request paths are appended to, e.g. "https://shop.example/api"
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// API client for the back-office backend.
/// Clone is cheap - the connection pool, session manager and refresh state are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    sessions: Arc<SessionManager>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a new API client backed by the given session manager
    pub fn new(config: &ApiClientConfig, sessions: Arc<SessionManager>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            sessions,
            refresher: Arc::new(RefreshCoordinator::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authentication =====

    /// Log in with phone number and password and store the new session.
    ///
    /// Login is never routed through the refresh interceptor: a 401 here
    /// means bad credentials.
    pub async fn login(&self, phone: &str, password: &str) -> Result<Session, ApiError> {
        let request = RequestDescriptor::post(
            LOGIN_PATH,
            json!({ "phone": phone, "password": password }),
        );
        let envelope: ApiEnvelope<Value> = self.dispatch(&request, None).await?;

        let session = Session::from_login_payload(envelope.into_data()?, None).ok_or_else(|| {
            ApiError::InvalidResponse("Login response has no access or refresh token".to_string())
        })?;

        self.sessions.set(session.clone()).await?;
        self.refresher.reset();
        info!("Login successful");
        Ok(session)
    }

    /// Start a session from a refresh token alone, e.g. one kept from an
    /// earlier run.
    pub async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let request = RequestDescriptor::post(
            REFRESH_PATH,
            serde_json::to_value(RefreshRequest { refresh_token })
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        );
        let body: Value = self.dispatch(&request, None).await?;
        if let Some(rejection) = Self::rejection(&body) {
            return Err(rejection);
        }

        let data = body.get("data").filter(|data| data.is_object()).cloned();
        let payload = data.unwrap_or(body);

        let session = Session::from_login_payload(payload, Some(refresh_token)).ok_or_else(|| {
            ApiError::InvalidResponse("Refresh response has no access token".to_string())
        })?;

        self.sessions.set(session.clone()).await?;
        self.refresher.reset();
        info!("Session restored from refresh token");
        Ok(session)
    }

    /// Forget the current session
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.sessions.clear().await?;
        self.refresher.reset();
        info!("Logged out");
        Ok(())
    }

    // ===== Request pipeline =====

    /// Dispatch a request and return its deserialized body.
    ///
    /// On a 401 for a request that still has its retry, the access token is
    /// refreshed (joining any refresh already in flight) and the request is
    /// replayed once with the new token. Without a session there is nothing
    /// to refresh and the 401 is returned as is.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T, ApiError> {
        let token = self.sessions.access_token().await;

        let error = match self.dispatch(&request, token.as_deref()).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if !error.is_unauthorized() {
            return Err(error);
        }
        let (Some(replay), Some(stale)) = (request.retry(), token) else {
            return Err(error);
        };

        debug!(path = %request.path, "Unauthorized, refreshing access token");
        let fresh = self.renew_access_token(&stale).await?;
        self.dispatch(&replay, Some(&fresh)).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        debug!(
            method = %request.method,
            path = %request.path,
            attempt = ?request.attempt,
            authenticated = token.is_some(),
            "API request"
        );

        let mut builder = self.client.request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        Self::read_body(response).await
    }

    /// A token to replay with after `stale` was rejected.
    async fn renew_access_token(&self, stale: &str) -> Result<String, ApiError> {
        match self.sessions.access_token().await {
            None => return Err(ApiError::NotAuthenticated),
            Some(current) if current != stale => {
                debug!("Access token already rotated, replaying with current token");
                return Ok(current);
            }
            Some(_) => {}
        }

        self.refresher
            .run(stale, || self.refresh_future())
            .await
            .map_err(|cause| {
                warn!(error = %cause, "Token refresh failed");
                ApiError::RefreshFailed(cause)
            })
    }

    fn refresh_future(&self) -> BoxFuture<'static, RefreshOutcome> {
        let client = self.client.clone();
        let url = self.url(REFRESH_PATH);
        let sessions = Arc::clone(&self.sessions);

        async move {
            Self::exchange_refresh_token(&client, &url, &sessions)
                .await
                .map_err(Arc::new)
        }
        .boxed()
    }

    /// Trade the stored refresh token for a new access token and store it.
    async fn exchange_refresh_token(
        client: &Client,
        url: &str,
        sessions: &SessionManager,
    ) -> Result<String, ApiError> {
        let refresh_token = sessions
            .refresh_token()
            .await
            .ok_or(ApiError::NotAuthenticated)?;

        info!("Refreshing access token");
        let response = client
            .post(url)
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let body: Value = Self::read_body(response).await?;

        if let Some(rejection) = Self::rejection(&body) {
            return Err(rejection);
        }
        let (access_token, rotated_refresh) = Self::extract_tokens(&body).ok_or_else(|| {
            ApiError::InvalidResponse("Refresh response has no access token".to_string())
        })?;

        sessions.rotate(access_token.clone(), rotated_refresh).await?;
        info!("Access token refreshed");
        Ok(access_token)
    }

    /// Access token and, if rotated, refresh token from a refresh response.
    /// Looks in `data` first, then at the top level.
    fn extract_tokens(body: &Value) -> Option<(String, Option<String>)> {
        let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

        [body.get("data"), Some(body)]
            .into_iter()
            .flatten()
            .filter(|source| source.is_object())
            .find_map(|source| {
                let access = ["token", "accessToken"]
                    .iter()
                    .find_map(|key| source.get(key).and_then(non_empty))?;
                let refresh = source.get("refreshToken").and_then(non_empty);
                Some((access, refresh))
            })
    }

    /// An explicit `success: false` body, as an error
    fn rejection(body: &Value) -> Option<ApiError> {
        if body.get("success") != Some(&Value::Bool(false)) {
            return None;
        }
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request was not successful");
        Some(ApiError::Rejected(message.to_string()))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Deserialize the body; an empty body reads as JSON `null`.
    async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        let json = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(json)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response body: {}", e)))
    }
}
