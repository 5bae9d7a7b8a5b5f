//! Error taxonomy for the book storage service and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, BookError>;

#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// Extension outside the allow-list
    #[error("Only PDF, EPUB, and DOCX files are allowed (got '{0}')")]
    InvalidFileType(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Uploaded file is empty")]
    EmptyFile,

    /// Multipart body could not be read or lacks a required part
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("The book you are trying to upload already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote object store unreachable or answered with a non-2xx status
    #[error("Upstream storage error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob delete failed, so the metadata record was kept
    #[error("Failed to delete stored file '{file_name}', record kept: {reason}")]
    PartialDelete { file_name: String, reason: String },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl BookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookError::InvalidFileType(_)
            | BookError::InvalidFileName(_)
            | BookError::EmptyFile
            | BookError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            BookError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BookError::AlreadyExists(_) => StatusCode::CONFLICT,
            BookError::NotFound(_) => StatusCode::NOT_FOUND,
            BookError::Upstream(_)
            | BookError::Io(_)
            | BookError::Database(_)
            | BookError::PartialDelete { .. }
            | BookError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Server-side failures get a generic text.
    pub fn public_message(&self) -> String {
        match self {
            BookError::InvalidFileType(_)
            | BookError::InvalidFileName(_)
            | BookError::EmptyFile
            | BookError::MalformedUpload(_)
            | BookError::PayloadTooLarge
            | BookError::AlreadyExists(_)
            | BookError::NotFound(_) => self.to_string(),
            BookError::Upstream(_) => "Remote storage is unavailable. Please try again later.".to_string(),
            BookError::Io(_) => "Internal server error during file operation.".to_string(),
            BookError::PartialDelete { .. } => {
                "The stored file could not be deleted; the book was kept.".to_string()
            }
            BookError::Database(_) | BookError::Unexpected(_) => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl IntoResponse for BookError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_map_to_client_statuses() {
        assert_eq!(BookError::InvalidFileType("txt".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BookError::AlreadyExists("a.pdf".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(BookError::NotFound("book 1".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = BookError::Upstream("connection refused to 10.0.0.3".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = BookError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk /dev/sda1 failed"));
        assert!(!err.public_message().contains("sda1"));
    }

    #[test]
    fn test_partial_delete_is_server_error() {
        let err = BookError::PartialDelete {
            file_name: "a.pdf".into(),
            reason: "timeout".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
