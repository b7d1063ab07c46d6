use std::sync::Arc;

use reqwest::StatusCode;
use sha2::{Digest, Sha256};

use vexel_adk_client::{AdkClient, AdkClientError};

/// Stable upstream user id: sha256 hex of the trimmed, lowercased e-mail.
/// The raw address never reaches the agent runtime.
pub fn user_id_hash(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Get-or-create semantics over the runtime's session store.
///
/// The session id is a pure function of (user, app), so "create" is safe to
/// call on every page load: an existing session is resumed, not duplicated.
/// The broker holds no state of its own — the runtime owns the session.
#[derive(Debug, Clone)]
pub struct SessionBroker {
    adk: Arc<AdkClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("{message}")]
    Upstream { message: String },
}

impl SessionBroker {
    pub fn new(adk: Arc<AdkClient>) -> Self {
        Self { adk }
    }

    #[must_use]
    pub fn derive_session_id(user_id: &str, app_name: &str) -> String {
        format!("{user_id}-{app_name}")
    }

    /// Two-step idempotent upsert: fetch first, create on any fetch
    /// failure. Create failure is the only true error — the caller blocks
    /// chat interaction and asks the user to reload.
    pub async fn get_or_create(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> Result<serde_json::Value, BrokerError> {
        let session_id = Self::derive_session_id(user_id, app_name);

        match self.adk.get_session(app_name, user_id, &session_id).await {
            Ok(session) => Ok(session),
            Err(fetch_error) => {
                tracing::info!(
                    target: "vexel.adk",
                    app_name,
                    session_id,
                    error = %fetch_error,
                    "no existing session; creating one",
                );
                self.adk
                    .create_session_with_id(app_name, user_id, &session_id)
                    .await
                    .map_err(|error| BrokerError::Upstream {
                        message: error.to_string(),
                    })
            }
        }
    }

    /// Best-effort deletion fired on navigation-away. Idempotent: the
    /// browser may fire it twice (unmount + unload), so an already-deleted
    /// session is success, not an error.
    pub async fn delete(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), BrokerError> {
        match self.adk.delete_session(app_name, user_id, session_id).await {
            Ok(()) => Ok(()),
            Err(AdkClientError::Http { status, .. }) if status == StatusCode::NOT_FOUND => {
                tracing::debug!(
                    target: "vexel.adk",
                    app_name,
                    session_id,
                    "session already deleted upstream",
                );
                Ok(())
            }
            Err(error) => Err(BrokerError::Upstream {
                message: error.to_string(),
            }),
        }
    }
}
