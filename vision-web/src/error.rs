//! Error types for vision-web

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vision_common::DuplicateLabel;

use crate::vision::{ImageSourceError, VisionError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Label detection returned the same description twice (500)
    #[error(transparent)]
    DuplicateLabel(#[from] DuplicateLabel),

    /// Image loading or vision service failure
    #[error(transparent)]
    Vision(#[from] VisionError),
}

impl ApiError {
    /// HTTP status and stable error code for the response body
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::DuplicateLabel(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DUPLICATE_LABEL"),
            ApiError::Vision(err) => match err {
                VisionError::MissingApiKey => {
                    (StatusCode::SERVICE_UNAVAILABLE, "VISION_NOT_CONFIGURED")
                }
                VisionError::Closed => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
                VisionError::Image(image_err) => match image_err {
                    ImageSourceError::InvalidReference(_)
                    | ImageSourceError::UnsupportedScheme(_) => {
                        (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                    }
                    ImageSourceError::TooLarge { .. } => {
                        (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
                    }
                    ImageSourceError::Io { source, .. }
                        if source.kind() == std::io::ErrorKind::NotFound =>
                    {
                        (StatusCode::NOT_FOUND, "IMAGE_NOT_FOUND")
                    }
                    ImageSourceError::Io { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR")
                    }
                    ImageSourceError::Fetch { .. } => (StatusCode::BAD_GATEWAY, "IMAGE_FETCH_FAILED"),
                },
                VisionError::Network(_)
                | VisionError::Http { .. }
                | VisionError::Api { .. }
                | VisionError::Parse(_)
                | VisionError::EmptyResponse => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<ImageSourceError> for ApiError {
    fn from(err: ImageSourceError) -> Self {
        ApiError::Vision(VisionError::Image(err))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
