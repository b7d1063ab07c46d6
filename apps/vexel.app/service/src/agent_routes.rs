use super::*;

pub(super) async fn index_page(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Html<String> {
    Html(web_maud::render_index_page(
        &session_view(&claims),
        &state.config.agent_apps,
    ))
}

pub(super) async fn chat_page(
    Extension(claims): Extension<SessionClaims>,
    Path(app_name): Path<String>,
) -> Html<String> {
    Html(web_maud::render_chat_page(&session_view(&claims), &app_name))
}

/// Create-or-resume the caller's session with this agent. The id is
/// derived from (user hash, app name), so reloading the page lands on the
/// same remote conversation.
pub(super) async fn create_agent_session(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(app_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiErrorTuple> {
    let user_id = user_id_hash(&claims.email);

    let session = state
        .broker
        .get_or_create(&app_name, &user_id)
        .await
        .map_err(|error| {
            tracing::error!(
                target: "vexel.adk",
                app_name = %app_name,
                error = %error,
                "session initialization failed",
            );
            upstream_error(format!("Failed to initialize session: {error}"))
        })?;

    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatTurnRequest {
    #[serde(default)]
    history: Vec<ChatMessage>,
    #[serde(default)]
    session_id: Option<String>,
}

pub(super) async fn send_chat_turn(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(app_name): Path<String>,
    Json(payload): Json<ChatTurnRequest>,
) -> Result<Json<Vec<serde_json::Value>>, ApiErrorTuple> {
    if payload.history.is_empty() {
        return Err(validation_error("history", "Chat history is required."));
    }
    let Some(session_id) = payload.session_id.and_then(non_empty) else {
        return Err(validation_error("sessionId", "Session ID is required."));
    };

    let user_id = user_id_hash(&claims.email);

    let parts = state
        .relay
        .send(&app_name, &user_id, &session_id, &payload.history)
        .await
        .map_err(|error| match error {
            RelayError::EmptyHistory => validation_error("history", "Chat history is required."),
            RelayError::Upstream { .. } | RelayError::MalformedFrame { .. } => {
                tracing::error!(
                    target: "vexel.adk",
                    app_name = %app_name,
                    session_id = %session_id,
                    error = %error,
                    "chat turn failed",
                );
                upstream_error(format!("The agent returned an error: {error}"))
            }
        })?;

    Ok(Json(parts))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteSessionQuery {
    #[serde(default)]
    session_id: Option<String>,
}

/// Fired by the browser on navigation-away with keepalive semantics:
/// best-effort, at-most-once, and safe to receive twice.
pub(super) async fn delete_agent_session(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(app_name): Path<String>,
    Query(query): Query<DeleteSessionQuery>,
) -> Result<Json<serde_json::Value>, ApiErrorTuple> {
    let Some(session_id) = query.session_id.and_then(non_empty) else {
        return Err(validation_error("sessionId", "Session ID is required."));
    };

    let user_id = user_id_hash(&claims.email);

    state
        .broker
        .delete(&app_name, &user_id, &session_id)
        .await
        .map_err(|error| {
            tracing::error!(
                target: "vexel.adk",
                app_name = %app_name,
                session_id = %session_id,
                error = %error,
                "session deletion failed",
            );
            upstream_error(format!(
                "An error occurred while deleting the session: {error}"
            ))
        })?;

    Ok(Json(serde_json::json!({
        "message": "Session deleted successfully"
    })))
}
