//! Error types for the logbook HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logbook_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while serving the logbook API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// The HTTP server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(std::io::Error),

    /// Missing or wrong API key.
    #[error("Unauthorized")]
    Unauthorized,

    /// The tenancy mode requires a code and none was supplied.
    #[error("code required")]
    CodeRequired,

    /// Invalid request body or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request body exceeded the configured limit.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// The log store rejected or failed the operation.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::CodeRequired => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::BindFailed(_, _) | Self::Serve(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the client. Storage details stay in the server log.
    fn public_message(&self) -> String {
        match self {
            Self::Storage(err) if err.is_validation() => err.to_string(),
            Self::Storage(StoreError::StorageRead { .. } | StoreError::Corrupt { .. }) => {
                "failed to read logs".to_string()
            }
            Self::Storage(StoreError::StorageWrite { .. } | StoreError::Encode(_)) => {
                "failed to write logs".to_string()
            }
            Self::Storage(_) | Self::BindFailed(_, _) | Self::Serve(_) | Self::Internal(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
