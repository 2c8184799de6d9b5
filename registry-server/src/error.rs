//! # Error Handling and Response Types
//!
//! Domain errors for each stage of the indexing pipeline, plus the boundary
//! [`AppError`] that every HTTP handler returns.
//!
//! ## Key Types
//!
//! - [`ExtractionError`]: a single archive could not be inspected
//! - [`IndexError`]: index bookkeeping or resolution failed
//! - [`FrameError`]: the binary upload frame is malformed
//! - [`AppError`]: boundary error mapped onto an HTTP status
//!
//! ## Error Response Format
//!
//! ```json
//! {
//!   "errors": [{"detail": "Human-readable error message"}],
//!   "error": "Human-readable error message",
//!   "code": "machine_readable_error_code",
//!   "details": null,
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```
//!
//! The `errors` array is the shape Cargo prints back to the user on a failed
//! `cargo publish`; the remaining fields are for everything else.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Failure while turning an archive on disk into a [`PackageManifest`].
///
/// [`PackageManifest`]: crate::cargo::PackageManifest
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest not found in archive at {0}")]
    ManifestNotFound(PathBuf),

    #[error("invalid manifest in archive {path}: {source}")]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("extraction task for {0} ended without producing a result")]
    Aborted(PathBuf),
}

/// Errors raised by the in-memory package index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid archive name '{0}': expected <name>-<version>.crate")]
    InvalidArchiveName(String),

    #[error("timed out after {timeout:?} waiting for '{name}' {version} to be indexed")]
    ResolutionTimeout {
        name: String,
        version: String,
        timeout: Duration,
    },

    #[error("failed to index '{name}' {version}: {source}")]
    Extraction {
        name: String,
        version: String,
        #[source]
        source: Arc<ExtractionError>,
    },
}

/// Protocol errors in the length-prefixed upload frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed upload frame: {0}")]
    Framing(String),

    #[error("invalid upload metadata: {0}")]
    Metadata(String),

    #[error("archive size mismatch: header declares {declared} bytes but {actual} were sent")]
    SizeMismatch { declared: usize, actual: usize },
}

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub errors: Vec<ErrorDetail>, // Cargo-compatible error list
    pub error: String,            // Human-readable error message
    pub code: String,             // Machine-readable error code
    pub details: Option<Value>,   // Additional error details
    pub timestamp: String,        // ISO 8601 timestamp
}

#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCode {
    ValidationError,
    ProtocolError,
    NotFound,
    Conflict,
    Timeout,
    InternalError,
    AuthError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::ProtocolError => "protocol_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Timeout => "timeout",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::AuthError => "auth_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::ProtocolError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Timeout | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::AuthError => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Application-specific error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(_) | AppError::Json(_) => ErrorCode::ValidationError,
            AppError::Frame(_) => ErrorCode::ProtocolError,
            AppError::Index(IndexError::InvalidArchiveName(_)) => ErrorCode::ValidationError,
            AppError::Index(IndexError::ResolutionTimeout { .. }) => ErrorCode::Timeout,
            AppError::Index(IndexError::Extraction { .. }) => ErrorCode::InternalError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Unauthorized(_) => ErrorCode::AuthError,
            AppError::Io(_) | AppError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    /// Get additional error details if available
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::Index(IndexError::Extraction { source, .. }) => {
                Some(json!({"source": source.to_string()}))
            }
            AppError::Index(IndexError::ResolutionTimeout { timeout, .. }) => {
                Some(json!({"timeout_secs": timeout.as_secs_f64()}))
            }
            _ => None,
        }
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        let code = self.error_code();
        let message = self.to_string();
        ApiErrorResponse {
            errors: vec![ErrorDetail {
                detail: message.clone(),
            }],
            error: message,
            code: code.as_str().to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        if matches!(code, ErrorCode::NotFound) {
            tracing::debug!(error = %self, "Request for unknown resource");
        } else {
            tracing::error!(error = %self, "Request failed");
        }

        let error_response = self.to_error_response();
        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        (status, axum::Json(error_response)).into_response()
    }
}

/// Convenient result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let conflict = AppError::Conflict("exists".to_string());
        assert_eq!(conflict.error_code().http_status(), StatusCode::CONFLICT);

        let timeout = AppError::from(IndexError::ResolutionTimeout {
            name: "sample".to_string(),
            version: "1.0.0".to_string(),
            timeout: Duration::from_secs(10),
        });
        assert_eq!(
            timeout.error_code().http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(timeout.error_code(), ErrorCode::Timeout);

        let frame = AppError::from(FrameError::Metadata("missing 'name'".to_string()));
        assert_eq!(frame.error_code().http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_response_has_cargo_errors_array() {
        let response = AppError::NotFound("Crate not found".to_string()).to_error_response();
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].detail, "Crate not found");
        assert_eq!(response.code, "not_found");
    }
}
