//! Storycast relay — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storycast_core::error::PresentationError;
use storycast_core::ids::SessionId;
use thiserror::Error;

/// Startup and runtime errors for the relay server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error(transparent)]
    Presentation(#[from] PresentationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Self::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            Self::Presentation(PresentationError::InvalidGraphReference(_)) => {
                (StatusCode::NOT_FOUND, "node_not_found")
            }
            Self::Presentation(PresentationError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            Self::Presentation(
                PresentationError::TransientFetch(_)
                | PresentationError::ChannelUnavailable(_)
                | PresentationError::DisplaySurfaceUnavailable(_),
            ) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Self::Presentation(PresentationError::Infrastructure(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
