//! HTTP client for the ChengeAI finance backend.
//!
//! The advisor chat and the user-info lookup are the only two calls this
//! crate makes. Both go through the [`AdvisorBackend`] trait so the session
//! logic can be exercised against a scripted double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Exchange;

/// Chat endpoint, relative to the backend base URL.
pub const CHAT_ENDPOINT: &str = "/api/ai/chat";

/// User-info endpoint, relative to the backend base URL.
pub const USER_INFO_ENDPOINT: &str = "/api/user/info";

/// Fallback avatar initial when user info is missing or malformed.
pub const DEFAULT_INITIAL: char = 'U';

/// Ways a backend call can fail.
///
/// The session collapses `Transport` and `Rejected` into one user-facing
/// failure message; the distinction only matters for logging.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure (connect, timeout, non-2xx status).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered but marked the request unsuccessful.
    #[error("backend rejected the request: {}", message.as_deref().unwrap_or("no detail"))]
    Rejected {
        /// Backend-supplied detail, never surfaced to the user.
        message: Option<String>,
    },
    /// The response decoded but did not carry the expected fields.
    #[error("malformed backend response")]
    Malformed,
}

/// Identity fields returned by `GET /api/user/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    /// Full display name, if the user set one.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
}

impl UserInfo {
    /// Single uppercase initial for the user avatar.
    ///
    /// Prefers `full_name`, falls back to `username`, then to
    /// [`DEFAULT_INITIAL`].
    #[must_use]
    pub fn display_initial(&self) -> char {
        self.full_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.username.as_deref())
            .and_then(|s| s.trim().chars().next())
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or(DEFAULT_INITIAL)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    message: &'a str,
    history: &'a [Exchange],
}

#[derive(Debug, Deserialize)]
struct ChatReplyBody {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoBody {
    data: UserInfo,
}

/// Outbound interface to the finance backend.
#[async_trait]
pub trait AdvisorBackend: Send + Sync {
    /// One chat round trip: the new message plus the trailing context window.
    async fn chat(&self, message: &str, history: &[Exchange]) -> Result<String, BackendError>;

    /// Fetch the identity used to derive the avatar initial.
    async fn user_info(&self) -> Result<UserInfo, BackendError>;
}

/// Production backend speaking JSON over HTTP via `reqwest`.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AdvisorBackend for HttpBackend {
    async fn chat(&self, message: &str, history: &[Exchange]) -> Result<String, BackendError> {
        let reply: ChatReplyBody = self
            .http
            .post(self.url(CHAT_ENDPOINT))
            .json(&ChatRequestBody { message, history })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !reply.success {
            return Err(BackendError::Rejected {
                message: reply.message,
            });
        }
        reply.response.ok_or(BackendError::Malformed)
    }

    async fn user_info(&self) -> Result<UserInfo, BackendError> {
        let body: UserInfoBody = self
            .http
            .get(self.url(USER_INFO_ENDPOINT))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.data)
    }
}
