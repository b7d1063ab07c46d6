use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Claim set extracted from a provider-verified ID token. Consumed once to
/// mint the first-party session credential, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{message}")]
    Unavailable { message: String },
    #[error("{message}")]
    Exchange { message: String },
    #[error("Failed to retrieve ID token from the provider.")]
    MissingIdToken,
    #[error("{message}")]
    Verification { message: String },
    #[error("Could not verify user information from token.")]
    MissingEmail,
}

/// External identity collaborator: turns an OAuth authorization code into a
/// verified identity assertion, or fails. Everything upstream of that
/// contract (consent UI, key material, token signing) belongs to the
/// provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn authorization_url(&self) -> Result<String, IdentityError>;

    async fn assert_identity(&self, code: &str) -> Result<IdentityAssertion, IdentityError>;
}

pub fn provider_from_config(config: &Config) -> Arc<dyn IdentityProvider> {
    if config.auth_provider_mode == "mock" {
        Arc::new(MockIdentityProvider)
    } else {
        Arc::new(GoogleIdentityProvider::from_config(config))
    }
}

#[derive(Debug, Clone)]
pub struct GoogleIdentityProvider {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    auth_url: String,
    token_url: String,
    tokeninfo_url: String,
    scopes: Vec<String>,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            tokeninfo_url: config.google_tokeninfo_url.clone(),
            scopes: config.oauth_scopes.clone(),
            timeout: Duration::from_millis(config.identity_timeout_ms.max(250)),
            http: reqwest::Client::new(),
        }
    }

    fn credentials(&self) -> Result<(String, String, String), IdentityError> {
        let client_id = non_empty(self.client_id.as_deref());
        let client_secret = non_empty(self.client_secret.as_deref());
        let redirect_uri = non_empty(self.redirect_uri.as_deref());

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => {
                Ok((client_id, client_secret, redirect_uri))
            }
            _ => Err(IdentityError::Unavailable {
                message: "OAuth client id, client secret, and redirect URI must be configured"
                    .to_string(),
            }),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self) -> Result<String, IdentityError> {
        let (client_id, _, redirect_uri) = self.credentials()?;

        let mut url = Url::parse(&self.auth_url).map_err(|error| IdentityError::Unavailable {
            message: format!("invalid authorization endpoint: {error}"),
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            // offline + forced consent so the provider issues a refresh
            // token to downstream agent tooling
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.into())
    }

    async fn assert_identity(&self, code: &str) -> Result<IdentityAssertion, IdentityError> {
        let (client_id, client_secret, redirect_uri) = self.credentials()?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .timeout(self.timeout)
            .form(&params)
            .send()
            .await
            .map_err(|error| IdentityError::Exchange {
                message: format!("token exchange request failed: {error}"),
            })?;
        let response = ensure_success(response, "token exchange")
            .await
            .map_err(|message| IdentityError::Exchange { message })?;
        let tokens: TokenExchangeResponse =
            response
                .json()
                .await
                .map_err(|error| IdentityError::Exchange {
                    message: format!("token exchange response was not valid JSON: {error}"),
                })?;

        let id_token = tokens
            .id_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(IdentityError::MissingIdToken)?;

        // The provider validates its own signature; we only have to check
        // that the token was minted for this client.
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .timeout(self.timeout)
            .query(&[("id_token", id_token.as_str())])
            .send()
            .await
            .map_err(|error| IdentityError::Verification {
                message: format!("ID token validation request failed: {error}"),
            })?;
        let response = ensure_success(response, "ID token validation")
            .await
            .map_err(|message| IdentityError::Verification { message })?;
        let info: TokenInfoResponse =
            response
                .json()
                .await
                .map_err(|error| IdentityError::Verification {
                    message: format!("ID token validation response was not valid JSON: {error}"),
                })?;

        if info.aud != client_id {
            return Err(IdentityError::Verification {
                message: "ID token was issued to a different client".to_string(),
            });
        }

        let email = info
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        Ok(IdentityAssertion {
            sub: info.sub,
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

/// Deterministic provider for tests and local development
/// (`VEXEL_AUTH_PROVIDER_MODE=mock`): any non-empty code becomes a stable
/// identity under the `vexel.test` domain.
#[derive(Debug, Clone)]
pub struct MockIdentityProvider;

pub const MOCK_AUTH_CODE: &str = "mock-code";

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn authorization_url(&self) -> Result<String, IdentityError> {
        Ok(format!("/api/auth/callback?code={MOCK_AUTH_CODE}"))
    }

    async fn assert_identity(&self, code: &str) -> Result<IdentityAssertion, IdentityError> {
        let local = code
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect::<String>();

        if local.is_empty() {
            return Err(IdentityError::Exchange {
                message: "authorization code was empty".to_string(),
            });
        }

        Ok(IdentityAssertion {
            sub: format!("mock_{local}"),
            email: format!("{local}@vexel.test"),
            name: Some("Mock User".to_string()),
            picture: None,
        })
    }
}

async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(format!("{operation} failed ({status}): {body}"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
