//! Error types for freezer-api.

use axum::http::{header::ALLOW, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use freezer_core::{SessionActionError, ALLOWED_METHODS};
use serde::Serialize;

/// Main error type for server startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be encoded or decoded.
    #[error("document error: {0}")]
    Serialization(#[from] freezer_types::TypesError),

    /// Session not found.
    #[error("session not found: {session_id}")]
    NotFound {
        /// The session ID that was not found.
        session_id: String,
    },

    /// Optimistic version check failed.
    #[error("version conflict on session {session_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The session ID.
        session_id: String,
        /// Version the caller expected.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
}

/// Errors returned by HTTP handlers.
///
/// Each variant maps to a status code and a JSON body
/// `{"title": ..., "description": ...}`. Storage failures are logged and
/// reported without internal details.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or path could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The state machine rejected the action.
    #[error(transparent)]
    Action(#[from] SessionActionError),

    /// A session or job does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    title: &'static str,
    description: String,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Action(SessionActionError::BadDataFormat { .. }) => StatusCode::BAD_REQUEST,
            Self::Action(SessionActionError::MethodNotImplemented { .. }) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::NotFound(_) | Self::Storage(StorageError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::Storage(StorageError::VersionConflict { .. }) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::Action(SessionActionError::BadDataFormat { .. }) => {
                "Bad Data Format"
            }
            Self::Action(SessionActionError::MethodNotImplemented { .. }) => {
                "Method Not Implemented"
            }
            Self::NotFound(_) | Self::Storage(StorageError::NotFound { .. }) => "Not Found",
            Self::Storage(StorageError::VersionConflict { .. }) => "Conflict",
            Self::Storage(_) => "Internal Server Error",
        }
    }

    fn description(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Action(SessionActionError::BadDataFormat { reason }) => reason.clone(),
            Self::Action(SessionActionError::MethodNotImplemented { action }) => {
                format!("Bad Action Method: {action}")
            }
            Self::Storage(e @ (StorageError::NotFound { .. } | StorageError::VersionConflict { .. })) => {
                e.to_string()
            }
            Self::Storage(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            title: self.title(),
            description: self.description(),
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
