use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::Config;
use crate::google_identity::IdentityAssertion;

type HmacSha256 = Hmac<Sha256>;

/// Hard ceiling on credential lifetime. Expiry is the only logout
/// mechanism besides the explicit logout route, so a misconfigured TTL
/// must not extend a session past a day.
const SESSION_TTL_CEILING_SECONDS: u64 = 86_400;

/// First-party session credential contents. Minted once at OAuth callback
/// time and re-verified on every request; there is no refresh path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SessionTokenService {
    signing_key: Option<String>,
    ttl_seconds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("{message}")]
    Unavailable { message: String },
    #[error("{message}")]
    Malformed { message: String },
    #[error("session token signature mismatch")]
    InvalidSignature,
    #[error("session token has expired")]
    Expired,
}

impl SessionTokenService {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signing_key: config.session_secret.clone(),
            ttl_seconds: config.session_ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds.min(SESSION_TTL_CEILING_SECONDS)
    }

    pub fn mint(&self, identity: &IdentityAssertion) -> Result<String, SessionTokenError> {
        self.mint_at(identity, Utc::now())
    }

    fn mint_at(
        &self,
        identity: &IdentityAssertion,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SessionTokenError> {
        let signing_key = self.signing_key()?;
        let expires_at = issued_at + Duration::seconds(self.ttl_seconds() as i64);

        let claims = SessionClaims {
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            sub: identity.sub.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode_hs256_jwt(&claims, &signing_key)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionTokenError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, SessionTokenError> {
        let signing_key = self.signing_key()?;

        let mut segments = token.split('.');
        let (Some(header_segment), Some(claims_segment), Some(signature_segment), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(SessionTokenError::Malformed {
                message: "session token must have three segments".to_string(),
            });
        };

        let header_bytes = decode_segment(header_segment, "header")?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_bytes).map_err(|error| {
                SessionTokenError::Malformed {
                    message: format!("session token header is not valid JSON: {error}"),
                }
            })?;
        if header.get("alg").and_then(|alg| alg.as_str()) != Some("HS256") {
            return Err(SessionTokenError::Malformed {
                message: "session token uses an unsupported algorithm".to_string(),
            });
        }

        let signature = decode_segment(signature_segment, "signature")?;
        let signing_input = format!("{header_segment}.{claims_segment}");
        let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes()).map_err(|error| {
            SessionTokenError::Unavailable {
                message: format!("failed to initialize session token verifier: {error}"),
            }
        })?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionTokenError::InvalidSignature)?;

        let claims_bytes = decode_segment(claims_segment, "claims")?;
        let claims: SessionClaims = serde_json::from_slice(&claims_bytes).map_err(|error| {
            SessionTokenError::Malformed {
                message: format!("session token claims are not valid: {error}"),
            }
        })?;

        if claims.email.trim().is_empty() {
            return Err(SessionTokenError::Malformed {
                message: "session token is missing the email claim".to_string(),
            });
        }

        if claims.exp <= now.timestamp() {
            return Err(SessionTokenError::Expired);
        }

        Ok(claims)
    }

    fn signing_key(&self) -> Result<String, SessionTokenError> {
        self.signing_key
            .as_ref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SessionTokenError::Unavailable {
                message: "session secret is not configured".to_string(),
            })
    }
}

fn encode_hs256_jwt(
    claims: &SessionClaims,
    signing_key: &str,
) -> Result<String, SessionTokenError> {
    let header = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });

    let header_bytes =
        serde_json::to_vec(&header).map_err(|error| SessionTokenError::Unavailable {
            message: format!("failed to encode session token header: {error}"),
        })?;
    let claims_bytes =
        serde_json::to_vec(claims).map_err(|error| SessionTokenError::Unavailable {
            message: format!("failed to encode session token claims: {error}"),
        })?;

    let header_segment = URL_SAFE_NO_PAD.encode(header_bytes);
    let claims_segment = URL_SAFE_NO_PAD.encode(claims_bytes);
    let signing_input = format!("{header_segment}.{claims_segment}");

    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes()).map_err(|error| {
        SessionTokenError::Unavailable {
            message: format!("failed to initialize session token signer: {error}"),
        }
    })?;
    mac.update(signing_input.as_bytes());
    let signature_segment = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature_segment}"))
}

fn decode_segment(segment: &str, label: &str) -> Result<Vec<u8>, SessionTokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|error| SessionTokenError::Malformed {
            message: format!("session token {label} segment is not valid base64: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(secret: &str, ttl_seconds: u64) -> SessionTokenService {
        SessionTokenService {
            signing_key: Some(secret.to_string()),
            ttl_seconds,
        }
    }

    fn identity() -> IdentityAssertion {
        IdentityAssertion {
            sub: "google-oauth2|1234567890".to_string(),
            email: "user@example.com".to_string(),
            name: Some("Example User".to_string()),
            picture: Some("https://example.com/avatar.png".to_string()),
        }
    }

    #[test]
    fn mint_then_verify_round_trips_claims() {
        let service = service_with("secret-a", 3_600);
        let token = service.mint(&identity()).expect("mint");
        let claims = service.verify(&token).expect("verify");

        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name.as_deref(), Some("Example User"));
        assert_eq!(
            claims.picture.as_deref(),
            Some("https://example.com/avatar.png")
        );
        assert_eq!(claims.sub, "google-oauth2|1234567890");
        assert_eq!(claims.exp - claims.iat, 3_600);
    }

    #[test]
    fn expired_token_fails_even_with_valid_signature() {
        let service = service_with("secret-a", 3_600);
        let issued_at = Utc::now() - Duration::seconds(7_200);
        let token = service.mint_at(&identity(), issued_at).expect("mint");

        let result = service.verify(&token);
        assert!(matches!(result, Err(SessionTokenError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_fails_signature_check() {
        let minting = service_with("secret-a", 3_600);
        let verifying = service_with("secret-b", 3_600);
        let token = minting.mint(&identity()).expect("mint");

        let result = verifying.verify(&token);
        assert!(matches!(result, Err(SessionTokenError::InvalidSignature)));
    }

    #[test]
    fn tampered_claims_fail_signature_check() {
        let service = service_with("secret-a", 3_600);
        let token = service.mint(&identity()).expect("mint");

        let mut segments: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&serde_json::json!({
                "email": "intruder@example.com",
                "sub": "x",
                "iat": 0,
                "exp": i64::MAX,
            }))
            .expect("encode forged claims"),
        );
        segments[1] = &forged_claims;
        let forged = segments.join(".");

        let result = service.verify(&forged);
        assert!(matches!(result, Err(SessionTokenError::InvalidSignature)));
    }

    #[test]
    fn structurally_invalid_tokens_are_malformed() {
        let service = service_with("secret-a", 3_600);
        for garbage in ["", "abc", "a.b", "a.b.c.d", "!!!.???.###"] {
            let result = service.verify(garbage);
            assert!(
                matches!(result, Err(SessionTokenError::Malformed { .. })),
                "expected malformed for {garbage:?}"
            );
        }
    }

    #[test]
    fn ttl_is_clamped_to_one_day() {
        let service = service_with("secret-a", 999_999);
        let token = service.mint(&identity()).expect("mint");
        let claims = service.verify(&token).expect("verify");
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn missing_secret_is_unavailable() {
        let service = SessionTokenService {
            signing_key: None,
            ttl_seconds: 3_600,
        };
        assert!(matches!(
            service.mint(&identity()),
            Err(SessionTokenError::Unavailable { .. })
        ));
    }
}
