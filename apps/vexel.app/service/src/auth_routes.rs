use super::*;

/// Initiates the provider OAuth flow. Fails closed with a generic 500 when
/// the OAuth client configuration is incomplete; specifics go to the log.
pub(super) async fn login_entry(State(state): State<AppState>) -> Response {
    match state.identity.authorization_url() {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(error) => {
            tracing::error!(
                target: "vexel.auth",
                error = %error,
                "OAuth configuration is incomplete",
            );
            internal_error("Server configuration error.").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code for a verified identity assertion,
/// mint the first-party session credential, set the cookie, and land on
/// the home surface. Every failure path redirects back to the login page
/// with a human-readable error.
pub(super) async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error.and_then(non_empty) {
        return login_error_redirect(&format!("OAuth error: {error}"));
    }

    let Some(code) = query.code.and_then(non_empty) else {
        return login_error_redirect("Authorization code was not provided.");
    };

    let assertion = match state.identity.assert_identity(&code).await {
        Ok(assertion) => assertion,
        Err(error) => {
            tracing::warn!(
                target: "vexel.auth",
                provider = state.identity.name(),
                error = %error,
                "identity assertion failed",
            );
            return login_error_redirect(&error.to_string());
        }
    };

    let token = match state.session_tokens.mint(&assertion) {
        Ok(token) => token,
        Err(error) => {
            tracing::error!(target: "vexel.auth", error = %error, "session mint failed");
            return login_error_redirect("Authentication failed. Please try again.");
        }
    };

    tracing::info!(
        target: "vexel.auth",
        provider = state.identity.name(),
        "login completed",
    );

    let mut response = Redirect::temporary("/").into_response();
    let cookie = session_cookie(
        &token,
        state.session_tokens.ttl_seconds(),
        state.config.cookie_secure,
    );
    if let Err(rejection) = append_set_cookie_header(&mut response, &cookie) {
        return rejection.into_response();
    }
    response
}

pub(super) async fn logout() -> Result<Response, ApiErrorTuple> {
    let mut response = (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    )
        .into_response();
    append_set_cookie_header(&mut response, &clear_cookie(SESSION_COOKIE_NAME))?;
    Ok(response)
}

/// Identity check for the browser. Always 200 — `user: null` is the
/// unauthenticated signal, not an error status.
pub(super) async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let user = session_claims_from_headers(&state, &headers).ok();
    Json(serde_json::json!({ "user": user }))
}

/// Login page. An already-authenticated visitor is sent home instead of
/// being shown the login form again.
pub(super) async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: axum::http::Uri,
) -> Response {
    if session_claims_from_headers(&state, &headers).is_ok() {
        return Redirect::temporary("/").into_response();
    }

    let error = query_param_value(uri.query(), "error");
    Html(web_maud::render_login_page(error.as_deref())).into_response()
}
