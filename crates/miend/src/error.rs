use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use mien_core::{AnalyzerError, UploadError};
use serde_json::json;

use crate::engine::EngineError;
use crate::render;

/// Application-level error type for HTTP handlers.
///
/// Renders as `{ "error": ..., "code": ... }` JSON. Browser routes wrap it
/// in [`HtmlError`] to get an error page instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The multipart body could not be read.
    #[error("Invalid upload body: {0}")]
    Multipart(MultipartError),

    /// The request body ran past the upload limit before it was fully read.
    #[error("Upload exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    /// A malformed request (missing field, unknown mode, ...).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Engine(EngineError::Upload(err))
    }
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        AppError::Engine(EngineError::Analyzer(err))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Wrap a multipart read failure, reporting `limit` when the body limit
    /// was what stopped it.
    pub fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::BodyTooLarge { limit }
        } else {
            AppError::Multipart(err)
        }
    }

    /// HTTP status, machine-readable code and user-facing message.
    ///
    /// Upstream messages are passed through verbatim.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        let message = self.to_string();
        let (status, code) = match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::BodyTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE"),
            AppError::Multipart(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Engine(EngineError::Upload(err)) => match err {
                UploadError::Empty
                | UploadError::UnsupportedExtension(_)
                | UploadError::TooSmall { .. } => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD"),
                UploadError::TooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE")
                }
                UploadError::UnsupportedFormat(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
                }
                UploadError::Corrupt(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CORRUPT_IMAGE"),
            },
            AppError::Engine(EngineError::Analyzer(err)) => match err {
                AnalyzerError::InvalidImage(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "IMAGE_REJECTED")
                }
                AnalyzerError::Throttled(_) => (StatusCode::TOO_MANY_REQUESTS, "THROTTLED"),
                AnalyzerError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
                AnalyzerError::AccessDenied(_) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ACCESS_DENIED")
                }
                AnalyzerError::Transport(_) | AnalyzerError::Service { .. } => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
                }
            },
            AppError::Engine(EngineError::ChannelClosed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_UNAVAILABLE")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %message, code, "request failed");
        } else {
            tracing::info!(error = %message, code, "request rejected");
        }

        (status, code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}

/// [`AppError`] rendered as an HTML page for the browser routes.
#[derive(Debug)]
pub struct HtmlError(pub AppError);

impl From<AppError> for HtmlError {
    fn from(err: AppError) -> Self {
        HtmlError(err)
    }
}

impl From<EngineError> for HtmlError {
    fn from(err: EngineError) -> Self {
        HtmlError(AppError::Engine(err))
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.0.classify();
        (status, Html(render::error_page(status, code, &message))).into_response()
    }
}
