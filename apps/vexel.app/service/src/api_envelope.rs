use std::collections::HashMap;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

pub type ApiErrorTuple = (StatusCode, Json<ApiErrorResponse>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidRequest,
    Unauthorized,
    NotFound,
    UpstreamError,
    InternalError,
}

impl ApiErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::UpstreamError => "upstream_error",
            Self::InternalError => "internal_error",
        }
    }

    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Error body shape shared by every API route. The top-level `message`
/// mirrors what browser-side callers read; `error.code` is the stable
/// machine-readable taxonomy.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub message: String,
    pub error: ApiErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

pub fn error_response(code: ApiErrorCode, message: impl Into<String>) -> ApiErrorTuple {
    let message = message.into();
    (
        code.default_status(),
        Json(ApiErrorResponse {
            message: message.clone(),
            error: ApiErrorDetail {
                code: code.as_str(),
                message,
            },
            errors: None,
        }),
    )
}

pub fn validation_error(field: &'static str, message: &str) -> ApiErrorTuple {
    let mut errors = HashMap::new();
    errors.insert(field.to_string(), vec![message.to_string()]);

    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse {
            message: message.to_string(),
            error: ApiErrorDetail {
                code: ApiErrorCode::InvalidRequest.as_str(),
                message: message.to_string(),
            },
            errors: Some(errors),
        }),
    )
}

pub fn unauthorized_error(message: &str) -> ApiErrorTuple {
    error_response(ApiErrorCode::Unauthorized, message)
}

pub fn not_found_error(message: impl Into<String>) -> ApiErrorTuple {
    error_response(ApiErrorCode::NotFound, message)
}

pub fn upstream_error(message: impl Into<String>) -> ApiErrorTuple {
    error_response(ApiErrorCode::UpstreamError, message)
}

pub fn internal_error(message: impl Into<String>) -> ApiErrorTuple {
    error_response(ApiErrorCode::InternalError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400_with_field_detail() {
        let (status, payload) = validation_error("sessionId", "Session ID is required.");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(payload.0).expect("serialize payload");
        assert_eq!(body["message"], "Session ID is required.");
        assert_eq!(body["error"]["code"], "invalid_request");
        assert_eq!(body["errors"]["sessionId"][0], "Session ID is required.");
    }

    #[test]
    fn upstream_error_is_a_500_with_stable_code() {
        let (status, payload) = upstream_error("agent runtime unreachable");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(payload.0).expect("serialize payload");
        assert_eq!(body["error"]["code"], "upstream_error");
    }

    #[test]
    fn codes_and_statuses_are_consistent() {
        for code in [
            ApiErrorCode::InvalidRequest,
            ApiErrorCode::Unauthorized,
            ApiErrorCode::NotFound,
            ApiErrorCode::UpstreamError,
            ApiErrorCode::InternalError,
        ] {
            let (status, payload) = error_response(code, "x");
            assert_eq!(status, code.default_status());
            assert_eq!(payload.0.error.code, code.as_str());
        }
    }
}
