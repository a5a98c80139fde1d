//! Transport-neutral responses and the error-to-status mapping.

use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use storywall_core::PostNoteError;

/// Status code plus JSON body, ready for any HTTP framework to write out.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => ApiError::Internal(format!("response serialization failed: {err}"))
                .into_response(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of the `error` field for failure responses.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Request failures as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound,
    MethodNotAllowed,
    TooManyRequests { retry_after_ms: u64 },
    Internal(String),
}

impl ApiError {
    /// - Validation: 400
    /// - Quota exceeded: 403
    /// - Unknown route: 404; wrong method: 405
    /// - Rate limited: 429
    /// - Store failure: 500
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::TooManyRequests { .. } => 429,
            Self::Internal(_) => 500,
        }
    }

    /// Internal details stay in the logs; clients only get a generic message.
    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(message) | Self::Forbidden(message) => json!({ "error": message }),
            Self::NotFound => json!({ "error": "Not found" }),
            Self::MethodNotAllowed => json!({ "error": "Method not allowed" }),
            Self::TooManyRequests { retry_after_ms } => json!({
                "error": "Too many requests",
                "retryAfterMs": retry_after_ms,
            }),
            Self::Internal(_) => json!({ "error": "Internal server error" }),
        };
        ApiResponse { status, body }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::NotFound => write!(f, "not found"),
            Self::MethodNotAllowed => write!(f, "method not allowed"),
            Self::TooManyRequests { retry_after_ms } => {
                write!(f, "too many requests; retry after {retry_after_ms} ms")
            }
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ApiError {}

impl From<PostNoteError> for ApiError {
    fn from(value: PostNoteError) -> Self {
        match value {
            PostNoteError::Validation(err) => Self::BadRequest(err.to_string()),
            PostNoteError::RateLimited { retry_after_ms } => {
                Self::TooManyRequests { retry_after_ms }
            }
            err @ PostNoteError::QuotaExceeded { .. } => Self::Forbidden(err.to_string()),
            PostNoteError::StoreUnavailable(err) => Self::Internal(err.to_string()),
        }
    }
}
