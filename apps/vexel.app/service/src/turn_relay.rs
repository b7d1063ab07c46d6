use std::sync::Arc;

use serde::Deserialize;

use vexel_adk_client::{AdkClient, AgentRunRequest, Content, TextPart};

/// One entry of the browser-held transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Forwards one chat turn to the runtime's synchronous run endpoint and
/// unwraps the framed event it answers with.
#[derive(Debug, Clone)]
pub struct TurnRelay {
    adk: Arc<AdkClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("chat history is empty")]
    EmptyHistory,
    #[error("{message}")]
    Upstream { message: String },
    #[error("{message}")]
    MalformedFrame { message: String },
}

impl TurnRelay {
    pub fn new(adk: Arc<AdkClient>) -> Self {
        Self { adk }
    }

    /// Only the newest message goes upstream; the runtime keeps the
    /// conversation keyed by session id. Returns the event's content parts
    /// verbatim.
    pub async fn send(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        history: &[ChatMessage],
    ) -> Result<Vec<serde_json::Value>, RelayError> {
        let last = history.last().ok_or(RelayError::EmptyHistory)?;

        let request = AgentRunRequest {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            new_message: Content {
                parts: vec![TextPart {
                    text: last.content.clone(),
                }],
            },
            streaming: false,
        };

        let body = self
            .adk
            .run(&request)
            .await
            .map_err(|error| RelayError::Upstream {
                message: error.to_string(),
            })?;

        parse_event_frame(&body)
    }
}

/// The non-streaming run endpoint still answers in event framing: a single
/// `data: {json}` line. Strip the prefix, parse the event, and pull out
/// `content.parts`.
fn parse_event_frame(body: &str) -> Result<Vec<serde_json::Value>, RelayError> {
    let line = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| RelayError::MalformedFrame {
            message: "agent response was empty".to_string(),
        })?;

    let payload = line
        .strip_prefix("data:")
        .ok_or_else(|| RelayError::MalformedFrame {
            message: "agent response is missing the event prefix".to_string(),
        })?;

    let event: serde_json::Value =
        serde_json::from_str(payload.trim()).map_err(|error| RelayError::MalformedFrame {
            message: format!("agent event payload is not valid JSON: {error}"),
        })?;

    event
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(serde_json::Value::as_array)
        .cloned()
        .ok_or_else(|| RelayError::MalformedFrame {
            message: "agent event is missing content parts".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_framed_event() {
        let body = r#"data: {"content":{"parts":[{"text":"hi there"}]}}"#;
        let parts = parse_event_frame(body).expect("parse");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "hi there");
    }

    #[test]
    fn tolerates_trailing_newline_and_leading_blank_lines() {
        let body = "\ndata: {\"content\":{\"parts\":[{\"text\":\"ok\"}]}}\n";
        let parts = parse_event_frame(body).expect("parse");
        assert_eq!(parts[0]["text"], "ok");
    }

    #[test]
    fn rejects_a_body_without_the_event_prefix() {
        let result = parse_event_frame(r#"{"content":{"parts":[]}}"#);
        assert!(matches!(result, Err(RelayError::MalformedFrame { .. })));
    }

    #[test]
    fn rejects_invalid_event_json() {
        let result = parse_event_frame("data: {not json");
        assert!(matches!(result, Err(RelayError::MalformedFrame { .. })));
    }

    #[test]
    fn rejects_an_event_without_content_parts() {
        let result = parse_event_frame(r#"data: {"content":{}}"#);
        assert!(matches!(result, Err(RelayError::MalformedFrame { .. })));

        let result = parse_event_frame(r#"data: {"done":true}"#);
        assert!(matches!(result, Err(RelayError::MalformedFrame { .. })));
    }

    #[test]
    fn rejects_an_empty_body() {
        let result = parse_event_frame("  \n ");
        assert!(matches!(result, Err(RelayError::MalformedFrame { .. })));
    }
}
