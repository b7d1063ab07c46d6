use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::extract::{Path, Query, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod api_envelope;
pub mod config;
pub mod google_identity;
pub mod session_broker;
pub mod session_token;
pub mod turn_relay;
pub mod web_maud;

mod agent_routes;
mod auth_routes;


use crate::api_envelope::{
    ApiErrorTuple, internal_error, unauthorized_error, upstream_error, validation_error,
};
use crate::config::Config;
use crate::google_identity::{IdentityProvider, provider_from_config};
use crate::session_broker::{SessionBroker, user_id_hash};
use crate::session_token::{SessionClaims, SessionTokenError, SessionTokenService};
use crate::turn_relay::{ChatMessage, RelayError, TurnRelay};
use crate::web_maud::SessionView;
use agent_routes::*;
use auth_routes::*;
use vexel_adk_client::{AdkClient, AdkClientConfig, AdkClientError};

const SERVICE_NAME: &str = "vexel-web-service";

pub const SESSION_COOKIE_NAME: &str = "auth_session_token";

/// Request-handling timeout for the whole router; generous compared to the
/// upstream call timeouts so those fail first with a typed error.
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Shared, immutable per-request context. All chat session state lives in
/// the remote agent runtime; nothing here is mutated across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    identity: Arc<dyn IdentityProvider>,
    session_tokens: SessionTokenService,
    broker: SessionBroker,
    relay: TurnRelay,
    started_at: SystemTime,
}

pub fn build_router(config: Config) -> Result<Router, AdkClientError> {
    let identity = provider_from_config(&config);
    let session_tokens = SessionTokenService::from_config(&config);
    let adk = Arc::new(AdkClient::new(
        AdkClientConfig::new(config.adk_base_url.as_str())
            .with_timeout_ms(config.adk_timeout_ms),
    )?);
    let broker = SessionBroker::new(Arc::clone(&adk));
    let relay = TurnRelay::new(adk);
    let static_dir = config.static_dir.clone();

    let state = AppState {
        config: Arc::new(config),
        identity,
        session_tokens,
        broker,
        relay,
        started_at: SystemTime::now(),
    };
    let gate_state = state.clone();

    Ok(Router::new()
        .route("/", get(index_page))
        .route("/login", get(login_page))
        .route("/adk/:app_name", get(chat_page))
        .route("/healthz", get(health))
        .route("/readyz", get(readiness))
        .route("/api/auth/login", get(login_entry))
        .route("/api/auth/callback", get(oauth_callback))
        .route("/api/auth/logout", get(logout))
        .route("/api/auth/session", get(current_session))
        .route("/api/adk/:app_name/session", post(create_agent_session))
        .route(
            "/api/adk/:app_name",
            post(send_chat_turn).delete(delete_agent_session),
        )
        .nest_service("/assets", ServeDir::new(static_dir))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            gate_state,
            route_protection_gate,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    REQUEST_TIMEOUT_SECONDS,
                ))),
        ))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    auth_provider: &'static str,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    static_dir: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = match state.started_at.elapsed() {
        Ok(duration) => duration.as_secs(),
        Err(_) => 0,
    };

    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        auth_provider: state.identity.name(),
    })
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let static_dir = state.config.static_dir.to_string_lossy().to_string();

    if state.config.static_dir.is_dir() {
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                static_dir,
            }),
        );
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ReadinessResponse {
            status: "not_ready",
            static_dir,
        }),
    )
}

/// Route protection: every path outside the exemption list needs a valid
/// session cookie. Pages bounce to the login form with a return path; API
/// calls get a 401 envelope.
async fn route_protection_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt_path(&path) {
        return next.run(request).await;
    }

    match session_claims_from_headers(&state, request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(error) => {
            tracing::debug!(
                target: "vexel.auth",
                path = %path,
                error = %error,
                "rejecting unauthenticated request",
            );
            if path.starts_with("/api/") {
                unauthorized_error("Unauthorized.").into_response()
            } else {
                redirect_to_login(&path)
            }
        }
    }
}

fn is_exempt_path(path: &str) -> bool {
    path.starts_with("/login")
        || path.starts_with("/api/auth/")
        || path.starts_with("/assets/")
        || path == "/favicon.ico"
        || path == "/healthz"
        || path == "/readyz"
}

fn redirect_to_login(original_path: &str) -> Response {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect_to", original_path)
        .finish();
    Redirect::temporary(&format!("/login?{query}")).into_response()
}

fn login_error_redirect(message: &str) -> Response {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("error", message)
        .finish();
    Redirect::temporary(&format!("/login?{query}")).into_response()
}

fn session_claims_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionClaims, SessionTokenError> {
    let token = extract_cookie_value(headers, SESSION_COOKIE_NAME).ok_or_else(|| {
        SessionTokenError::Malformed {
            message: "session cookie is missing".to_string(),
        }
    })?;
    state.session_tokens.verify(&token)
}

fn session_view(claims: &SessionClaims) -> SessionView {
    SessionView {
        email: claims.email.clone(),
        display_name: claims
            .name
            .clone()
            .unwrap_or_else(|| claims.email.clone()),
    }
}

fn session_cookie(token: &str, max_age_seconds: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn append_set_cookie_header(response: &mut Response, cookie: &str) -> Result<(), ApiErrorTuple> {
    response.headers_mut().append(SET_COOKIE, header_value(cookie)?);
    Ok(())
}

fn header_value(raw: &str) -> Result<HeaderValue, ApiErrorTuple> {
    HeaderValue::from_str(raw)
        .map_err(|error| internal_error(format!("failed to encode header value: {error}")))
}

fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for part in raw.split(';') {
        let mut pieces = part.trim().splitn(2, '=');
        let (Some(key), Some(value)) = (pieces.next(), pieces.next()) else {
            continue;
        };

        if key.trim() == cookie_name {
            return non_empty(value.trim().to_string());
        }
    }

    None
}

fn query_param_value(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
        .and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
