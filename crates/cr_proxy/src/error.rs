//! 代理边界的错误响应：`{ "error": "..." }`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use cr_core::{ConvoRelayError, ErrorKind};

pub const MISSING_KEY_MESSAGE: &str = "Server missing API Key";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

impl From<ConvoRelayError> for ApiError {
    fn from(err: ConvoRelayError) -> Self {
        if err.kind() == ErrorKind::Configuration {
            return Self::new(StatusCode::INTERNAL_SERVER_ERROR, MISSING_KEY_MESSAGE);
        }
        match err {
            ConvoRelayError::MalformedRequest(m) => Self::new(StatusCode::BAD_REQUEST, m),
            ConvoRelayError::RateLimited(m) => Self::new(StatusCode::TOO_MANY_REQUESTS, m),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
