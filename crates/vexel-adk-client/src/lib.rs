use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// HTTP client for the Agent Development Kit runtime REST surface.
///
/// The runtime owns all session and conversation state; this client only
/// addresses it. Calls are single-shot — failures surface to the caller
/// immediately, there is no retry loop.
#[derive(Debug, Clone)]
pub struct AdkClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl AdkClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AdkClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum AdkClientError {
    #[error("adk_client_base_url_missing")]
    BaseUrlMissing,
    #[error("adk_client_invalid_path")]
    InvalidPath,
    #[error("adk_request_failed:{message}")]
    Request { message: String },
    #[error("adk_read_failed:{message}")]
    Read { message: String },
    #[error("adk_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("adk_json_decode_failed:{message}")]
    Decode { message: String },
}

/// One text part of an agent message.
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// Message content as the runtime models it: an ordered list of parts.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

/// A single synchronous run request against `/run_sse`.
///
/// The runtime keys conversational memory on `session_id`, so the request
/// carries only the newest message, not the full history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: Content,
    pub streaming: bool,
}

impl AdkClient {
    pub fn new(config: AdkClientConfig) -> Result<Self, AdkClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn session_path(app_name: &str, user_id: &str, session_id: &str) -> String {
        format!(
            "/apps/{}/users/{}/sessions/{}",
            app_name.trim(),
            user_id.trim(),
            session_id.trim()
        )
    }

    #[must_use]
    pub fn run_sse_path() -> &'static str {
        "/run_sse"
    }

    /// Fetch an existing session. The representation is returned verbatim.
    pub async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<serde_json::Value, AdkClientError> {
        let path = Self::session_path(app_name, user_id, session_id);
        let url = self.endpoint(&path).ok_or(AdkClientError::InvalidPath)?;
        let response = self
            .http
            .get(url)
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| AdkClientError::Request {
                message: error.to_string(),
            })?;
        decode_json_response(response).await
    }

    /// Create a session under an explicit, caller-chosen id.
    pub async fn create_session_with_id(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<serde_json::Value, AdkClientError> {
        let path = Self::session_path(app_name, user_id, session_id);
        let url = self.endpoint(&path).ok_or(AdkClientError::InvalidPath)?;
        let response = self
            .http
            .post(url)
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|error| AdkClientError::Request {
                message: error.to_string(),
            })?;
        decode_json_response(response).await
    }

    pub async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), AdkClientError> {
        let path = Self::session_path(app_name, user_id, session_id);
        let url = self.endpoint(&path).ok_or(AdkClientError::InvalidPath)?;
        let response = self
            .http
            .delete(url)
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| AdkClientError::Request {
                message: error.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|error| AdkClientError::Read {
                message: error.to_string(),
            })?;
        Err(format_http_error(status, &bytes))
    }

    /// Execute one non-streaming turn. The endpoint answers with a framed
    /// event body, so this returns the raw text and leaves the framing to
    /// the caller.
    pub async fn run(&self, request: &AgentRunRequest) -> Result<String, AdkClientError> {
        let url = self
            .endpoint(Self::run_sse_path())
            .ok_or(AdkClientError::InvalidPath)?;
        let response = self
            .http
            .post(url)
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|error| AdkClientError::Request {
                message: error.to_string(),
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| AdkClientError::Read {
                message: error.to_string(),
            })?;

        if !status.is_success() {
            return Err(format_http_error(status, &bytes));
        }

        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> AdkClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    AdkClientError::Http { status, body }
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

fn normalize_base_url(base_url: &str) -> Result<String, AdkClientError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(AdkClientError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, AdkClientError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| AdkClientError::Read {
            message: error.to_string(),
        })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| AdkClientError::Decode {
        message: error.to_string(),
    })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
