//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::llm::ChatError;
use crate::search::SearchError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Search pipeline operation failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Chat completion failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Search(err) => match err {
                SearchError::InvalidSchema(_)
                | SearchError::InvalidConnection(_)
                | SearchError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
                SearchError::NotFound(_) => StatusCode::NOT_FOUND,
                SearchError::MissingDependency(_)
                | SearchError::SchemaConflict(_)
                | SearchError::IndexerBusy(_) => StatusCode::CONFLICT,
                SearchError::StorageUnavailable(_)
                | SearchError::Upstream(_)
                | SearchError::CollaboratorUnconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Chat(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the client.
    fn detail(&self) -> String {
        match self {
            // Don't expose database internals to clients
            Self::Database(RepositoryError::Database(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, status = %status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
