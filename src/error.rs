//! Error handling for the annotation server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::capture::DecodeError;
use crate::storage::StoreError;
use crate::video::SinkError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session not active / not stored
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the session's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Posted frame could not be decoded
    #[error("Frame decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Video encoding failure
    #[error("Video error: {0}")]
    Video(#[from] SinkError),

    /// Session store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short client-facing reason, e.g. `"not found"`
    pub fn reason(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not found",
            Error::Validation(_) | Error::Decode(_) => "invalid request",
            Error::Storage(StoreError::InvalidSessionId(_)) => "invalid request",
            Error::Conflict(_) => "conflict",
            Error::Video(_) => "video error",
            Error::Storage(_) => "storage error",
            Error::Internal(_) => "internal error",
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Error::Decode(_) => (StatusCode::BAD_REQUEST, "DECODE_ERROR"),
            Error::Video(SinkError::DimensionMismatch { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "FRAME_SIZE_MISMATCH")
            }
            Error::Video(_) => (StatusCode::INTERNAL_SERVER_ERROR, "VIDEO_ERROR"),
            Error::Storage(StoreError::InvalidSessionId(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Body extraction failures answer in the same JSON shape as every other error
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error_code, message = %message, "Request error");
        } else {
            tracing::warn!(status = %status, error_code, message = %message, "Request rejected");
        }

        let body = Json(json!({
            "ok": false,
            "error": self.reason(),
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
