use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::io;

use crate::processor::{ComputationError, LoadError};

pub const DATASET_NOT_FOUND: &str = "Dataset not found";

/// Error body `{"error": message}` with a status code
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// A user-supplied file that failed to load
    pub fn upload(err: LoadError) -> Self {
        Self::bad_request(err.to_string())
    }

    /// The configured dataset failed to load
    pub fn dataset(err: LoadError) -> Self {
        match err {
            LoadError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                Self::not_found(DATASET_NOT_FOUND)
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<ComputationError> for ApiError {
    fn from(err: ComputationError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
