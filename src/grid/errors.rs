//! # Grid Errors
//!
//! Error types for the grid request pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for grid operations
pub type GridResult<T> = Result<T, GridError>;

/// Grid pipeline errors
#[derive(Debug, Error)]
pub enum GridError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// The ad-hoc filter blob was not supplied
    #[error("Missing filter declaration: {0}")]
    MissingFilters(String),

    /// The ad-hoc filter blob could not be parsed
    #[error("Invalid filter declaration: {0}")]
    InvalidFilters(String),

    /// A grid field failed validation against the view
    #[error("Invalid grid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// Column key or index does not exist in the field mapping
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// POST requests must be XMLHttpRequest
    #[error("Grid data requests must be sent as XMLHttpRequest")]
    NotAjax,

    /// GET requests are only served as exports
    #[error("GET requests must carry the download flag")]
    DownloadRequired,

    /// Actor may not use this view in this mode
    #[error("Access denied")]
    AccessDenied,

    /// No view is registered under this resource name
    #[error("View not found: {0}")]
    ViewNotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// View configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the backing store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GridError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            GridError::MissingFilters(_) => StatusCode::BAD_REQUEST,
            GridError::InvalidFilters(_) => StatusCode::BAD_REQUEST,
            GridError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            GridError::UnknownColumn(_) => StatusCode::BAD_REQUEST,
            GridError::NotAjax => StatusCode::BAD_REQUEST,
            GridError::DownloadRequired => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            GridError::AccessDenied => StatusCode::FORBIDDEN,

            // 404 Not Found
            GridError::ViewNotFound(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            GridError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GridError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a validation failure on a named field
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GridError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<GridError> for ErrorResponse {
    fn from(err: GridError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "grid request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "grid request rejected");
        }
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
