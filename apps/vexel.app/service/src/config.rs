use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8686";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STATIC_DIR: &str = "apps/vexel.app/service/static";
const DEFAULT_AUTH_PROVIDER_MODE: &str = "google";
const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_OAUTH_SCOPES: &str = "https://www.googleapis.com/auth/userinfo.email \
    https://www.googleapis.com/auth/userinfo.profile \
    openid \
    https://www.googleapis.com/auth/cloud-platform.read-only \
    https://www.googleapis.com/auth/gmail.send \
    https://www.googleapis.com/auth/gmail.readonly \
    https://www.googleapis.com/auth/bigquery \
    https://www.googleapis.com/auth/gmail.compose \
    https://www.googleapis.com/auth/calendar.events";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;
const DEFAULT_COOKIE_SECURE: bool = false;
const DEFAULT_ADK_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_ADK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_IDENTITY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_AGENT_APPS: &str = "sales-agent";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub static_dir: PathBuf,
    pub auth_provider_mode: String,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub oauth_redirect_uri: Option<String>,
    pub oauth_scopes: Vec<String>,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_tokeninfo_url: String,
    pub session_secret: Option<String>,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub adk_base_url: String,
    pub adk_timeout_ms: u64,
    pub identity_timeout_ms: u64,
    pub agent_apps: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid VEXEL_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env_string("VEXEL_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter =
            env_string("VEXEL_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let static_dir = env_string("VEXEL_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let auth_provider_mode = env_string("VEXEL_AUTH_PROVIDER_MODE")
            .unwrap_or_else(|| DEFAULT_AUTH_PROVIDER_MODE.to_string())
            .to_lowercase();

        let oauth_scopes = parse_list(
            &env_string("VEXEL_OAUTH_SCOPES").unwrap_or_else(|| DEFAULT_OAUTH_SCOPES.to_string()),
        );

        let session_ttl_seconds =
            env_u64("VEXEL_SESSION_TTL_SECONDS").unwrap_or(DEFAULT_SESSION_TTL_SECONDS);

        let cookie_secure = env_bool("VEXEL_COOKIE_SECURE").unwrap_or(DEFAULT_COOKIE_SECURE);

        let adk_base_url =
            env_string("ADK_API_BASE_URL").unwrap_or_else(|| DEFAULT_ADK_BASE_URL.to_string());
        let adk_timeout_ms = env_u64("VEXEL_ADK_TIMEOUT_MS").unwrap_or(DEFAULT_ADK_TIMEOUT_MS);
        let identity_timeout_ms =
            env_u64("VEXEL_IDENTITY_TIMEOUT_MS").unwrap_or(DEFAULT_IDENTITY_TIMEOUT_MS);

        let agent_apps = parse_list(
            &env_string("VEXEL_AGENT_APPS").unwrap_or_else(|| DEFAULT_AGENT_APPS.to_string()),
        );

        Ok(Self {
            bind_addr,
            log_filter,
            static_dir,
            auth_provider_mode,
            oauth_client_id: env_string("OAUTH_CLIENT_ID"),
            oauth_client_secret: env_string("OAUTH_CLIENT_SECRET"),
            oauth_redirect_uri: env_string("REDIRECT_URI"),
            oauth_scopes,
            google_auth_url: env_string("VEXEL_GOOGLE_AUTH_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            google_token_url: env_string("VEXEL_GOOGLE_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            google_tokeninfo_url: env_string("VEXEL_GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_TOKENINFO_URL.to_string()),
            session_secret: env_string("SESSION_SECRET"),
            session_ttl_seconds,
            cookie_secure,
            adk_base_url,
            adk_timeout_ms,
            identity_timeout_ms,
            agent_apps,
        })
    }

    /// Deterministic configuration for router-level tests: mock identity
    /// provider, fixed signing secret, no network defaults beyond the ADK
    /// base URL (tests point it at a local mock server).
    pub fn for_tests(static_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            static_dir,
            auth_provider_mode: "mock".to_string(),
            oauth_client_id: Some("vexel-test-client".to_string()),
            oauth_client_secret: Some("vexel-test-secret".to_string()),
            oauth_redirect_uri: Some("http://127.0.0.1:8686/api/auth/callback".to_string()),
            oauth_scopes: parse_list(DEFAULT_OAUTH_SCOPES),
            google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            google_tokeninfo_url: DEFAULT_GOOGLE_TOKENINFO_URL.to_string(),
            session_secret: Some("vexel-test-session-secret".to_string()),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
            adk_base_url: DEFAULT_ADK_BASE_URL.to_string(),
            adk_timeout_ms: DEFAULT_ADK_TIMEOUT_MS,
            identity_timeout_ms: DEFAULT_IDENTITY_TIMEOUT_MS,
            agent_apps: vec!["sales-agent".to_string()],
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|value| value.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Splits a comma- or whitespace-separated list, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_handles_commas_and_whitespace() {
        assert_eq!(
            parse_list("sales-agent, calendar-agent  charts-agent,"),
            vec!["sales-agent", "calendar-agent", "charts-agent"]
        );
        assert!(parse_list("  ,  ").is_empty());
    }

    #[test]
    fn default_scope_set_matches_consent_request() {
        let scopes = parse_list(DEFAULT_OAUTH_SCOPES);
        assert_eq!(scopes.len(), 9);
        assert!(scopes.contains(&"openid".to_string()));
        assert!(scopes.contains(&"https://www.googleapis.com/auth/userinfo.email".to_string()));
    }

    #[test]
    fn test_config_uses_mock_provider() {
        let config = Config::for_tests(PathBuf::from("."));
        assert_eq!(config.auth_provider_mode, "mock");
        assert!(config.session_secret.is_some());
        assert_eq!(config.session_ttl_seconds, 86_400);
    }
}
