//! Clubhouse backend REST client.
//!
//! # Architecture
//!
//! - JSON request/response over `reqwest`
//! - Bearer token taken from the [`AuthContext`] the client was built with
//! - Generic `get`/`post`/`put`/`patch`/`delete` helpers; endpoint-specific
//!   methods live in the submodules and are all `impl ApiClient`
//! - No retries: every failure is returned to the caller as an [`ApiError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use clubhouse_client::{ApiClient, AuthContext, ClientConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let auth = AuthContext::new(FileSessionStore::new(&config.session_file));
//! auth.init().await?;
//!
//! let api = ApiClient::new(&config, auth)?;
//! let clubs = api.list_clubs().await?;
//! ```

mod auth;
mod clubs;
mod commerce;
mod events;
mod payments;
mod points;
pub mod types;

use std::borrow::Cow;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Categorized, ErrorCategory};
use crate::session::{AuthContext, SessionError};

pub use types::*;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the credentials or the session expired.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// An identifier that cannot be used as a path segment.
    #[error("Invalid identifier in path: {0:?}")]
    InvalidPathSegment(String),

    /// Session storage failed while signing in or out.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Whether the backend rejected the request as invalid (4xx other than auth).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 400 && *status < 500)
    }
}

impl Categorized for ApiError {
    fn category(&self) -> ErrorCategory {
        if self.is_client_error() || matches!(self, Self::InvalidPathSegment(_)) {
            ErrorCategory::Validation
        } else {
            ErrorCategory::Network
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::NotFound(_) | Self::InvalidPathSegment(_) => {
                "The requested item could not be found.".to_string()
            }
            Self::RateLimited(secs) => {
                format!("Too many requests. Please wait {secs} seconds and try again.")
            }
            // 4xx messages are written by the backend for end users
            Self::Api { message, .. } if self.is_client_error() => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Client for the Clubhouse backend.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the
/// session context.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    auth: AuthContext,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, auth: AuthContext) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("clubhouse-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                auth,
            }),
        })
    }

    /// The session context this client authenticates with.
    #[must_use]
    pub fn auth(&self) -> &AuthContext {
        &self.inner.auth
    }

    // =========================================================================
    // Generic helpers
    // =========================================================================

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures, non-2xx responses, or
    /// bodies that do not deserialize into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path)?).await
    }

    /// `GET` a JSON resource with query parameters.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path)?.query(query)).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// `PUT` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path)?.json(body)).await
    }

    /// `PATCH` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PATCH, path)?.json(body)).await
    }

    /// `DELETE` a resource.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::DELETE, path)?).await
    }

    // =========================================================================
    // Request execution
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        Ok(self.inner.client.request(method, url))
    }

    #[instrument(skip(self, request))]
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request = match self.inner.auth.bearer_token().await {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.header("Accept", "application/json").send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            tracing::debug!(status = status.as_u16(), %message, "Backend returned error");
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        // Empty bodies (204, bare 200) deserialize as JSON null so `()` works
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse backend response");
            ApiError::Parse(e)
        })
    }
}

/// Percent-encode an identifier as a single path segment.
///
/// `/`, `?` and `#` are escaped so the identifier cannot leave its segment.
/// Empty, `.` and `..` are rejected because URL resolution would collapse them
/// into a different endpoint.
pub(crate) fn segment(id: &str) -> Result<Cow<'_, str>, ApiError> {
    match id {
        "" | "." | ".." => Err(ApiError::InvalidPathSegment(id.to_owned())),
        _ => Ok(urlencoding::encode(id)),
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}
