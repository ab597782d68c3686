use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::features::auth::clients::OAuthError;
use crate::features::files::models::object_path;
use crate::features::files::services::FileError;
use crate::shared::constants::*;
use crate::shared::types::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File not found or not public: {0}")]
    FileNotPublic(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("File modified concurrently: {0}")]
    FileModified(String),

    #[error("Empty file: {0}")]
    EmptyFile(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Invalid file header: {0}")]
    InvalidHeaderFile(String),

    #[error("Mismatch content type: {0}")]
    MismatchContentType(String),

    #[error("Nothing to delete: {0}")]
    EmptyData(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Already have valid token: {0}")]
    AlreadyHaveToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Guest token rate limit exceeded: {0}")]
    TokenRateLimitExceeded(String),

    #[error("Storage timeout: {0}")]
    Timeout(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind carried in the `type` field of the error body
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::FileNotFound(_) => ERROR_TYPE_FILE_NOT_FOUND,
            AppError::FileNotPublic(_) => ERROR_TYPE_FILE_NOT_PUBLIC,
            AppError::FileExists(_) => ERROR_TYPE_FILE_EXISTS,
            AppError::FileModified(_) => ERROR_TYPE_FILE_MODIFIED,
            AppError::EmptyFile(_) => ERROR_TYPE_EMPTY_FILE,
            AppError::InvalidFileName(_) => ERROR_TYPE_INVALID_FILE_NAME,
            AppError::UnsupportedContentType(_) => ERROR_TYPE_UNSUPPORTED_TYPE,
            AppError::InvalidHeaderFile(_) => ERROR_TYPE_INVALID_HEADER_FILE,
            AppError::MismatchContentType(_) => ERROR_TYPE_MISMATCH_TYPE,
            AppError::EmptyData(_) => ERROR_TYPE_EMPTY_DATA,
            AppError::InvalidToken(_) => ERROR_TYPE_INVALID_TOKEN,
            AppError::AlreadyHaveToken(_) => ERROR_TYPE_HAVE_TOKEN,
            AppError::Unauthorized(_) => ERROR_TYPE_UNAUTHORIZED,
            AppError::BadRequest(_) => ERROR_TYPE_BAD_REQUEST,
            AppError::ResourceNotFound(_) => ERROR_TYPE_RESOURCE_NOT_FOUND,
            AppError::MethodNotAllowed(_) => ERROR_TYPE_METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => ERROR_TYPE_ENTITY_TOO_LARGE,
            AppError::RateLimitExceeded(_) => ERROR_TYPE_TOO_MANY_REQUEST,
            AppError::TokenRateLimitExceeded(_) => ERROR_TYPE_TOO_MANY_REQUEST_TOKEN,
            AppError::Timeout(_) => ERROR_TYPE_STORAGE_TIMEOUT,
            AppError::ExternalServiceError(_) => ERROR_TYPE_EXTERNAL_SERVICE,
            AppError::Internal(_) => ERROR_TYPE_UNKNOWN,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileNotFound(_)
            | AppError::FileNotPublic(_)
            | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::FileExists(_) | AppError::FileModified(_) => StatusCode::CONFLICT,
            AppError::EmptyFile(_)
            | AppError::InvalidFileName(_)
            | AppError::MismatchContentType(_)
            | AppError::EmptyData(_)
            | AppError::InvalidToken(_)
            | AppError::AlreadyHaveToken(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::InvalidHeaderFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimitExceeded(_) | AppError::TokenRateLimitExceeded(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let description = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong, please try again later".to_string()
            }
            AppError::ExternalServiceError(msg) => {
                tracing::error!("External service error: {}", msg);
                "Identity provider is unavailable".to_string()
            }
            AppError::Timeout(msg) => {
                tracing::warn!("Storage timeout: {}", msg);
                "Storage did not respond in time, please retry".to_string()
            }
            AppError::FileNotFound(msg)
            | AppError::FileNotPublic(msg)
            | AppError::FileExists(msg)
            | AppError::FileModified(msg)
            | AppError::EmptyFile(msg)
            | AppError::InvalidFileName(msg)
            | AppError::UnsupportedContentType(msg)
            | AppError::InvalidHeaderFile(msg)
            | AppError::MismatchContentType(msg)
            | AppError::EmptyData(msg)
            | AppError::InvalidToken(msg)
            | AppError::AlreadyHaveToken(msg)
            | AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::ResourceNotFound(msg)
            | AppError::MethodNotAllowed(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::RateLimitExceeded(msg)
            | AppError::TokenRateLimitExceeded(msg) => msg,
        };

        (status, Json(ApiError::new(error_type, description))).into_response()
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(key) => {
                AppError::FileNotFound(format!("File {} is not found", file_name(&key)))
            }
            FileError::NotPublic(key) => AppError::FileNotPublic(format!(
                "File {} is not found or not public",
                file_name(&key)
            )),
            FileError::AlreadyExists(key) => {
                AppError::FileExists(format!("File {} already exists", file_name(&key)))
            }
            FileError::ModifiedConcurrently(key) => AppError::FileModified(format!(
                "File {} was modified by another request, please retry",
                file_name(&key)
            )),
            FileError::EmptyBody => AppError::EmptyFile("Cannot upload empty file".to_string()),
            FileError::InvalidFileName(_) => AppError::InvalidFileName(
                "File name must be alphanumeric, underscore or dash, with an extension separated by a dot"
                    .to_string(),
            ),
            FileError::UnsupportedContentType(content_type) => AppError::UnsupportedContentType(
                format!("Unsupported Content-Type: {}", content_type),
            ),
            FileError::InvalidMetadata(e) => AppError::InvalidHeaderFile(e.to_string()),
            FileError::ExpiryPolicy(e) => AppError::InvalidHeaderFile(e.to_string()),
            FileError::MismatchContentType { .. } => AppError::MismatchContentType(
                "Please use the same content type as the original file".to_string(),
            ),
            FileError::EmptyData(owner) => {
                AppError::EmptyData(format!("No files to delete for {}", owner))
            }
            FileError::InvalidPath(e) => AppError::BadRequest(e.to_string()),
            e @ FileError::CorruptMetadata { .. } => AppError::Internal(e.to_string()),
            e @ FileError::Timeout(_) => AppError::Timeout(e.to_string()),
            FileError::Store(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Filename part of an `owner/filename` key; other values pass through
fn file_name(key: &str) -> &str {
    object_path::split(key)
        .map(|(_, filename)| filename)
        .unwrap_or(key)
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Rejected(msg) => AppError::InvalidToken(msg),
            other => AppError::ExternalServiceError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::{MetadataError, MetadataField};

    #[test]
    fn test_file_errors_map_to_stable_kinds() {
        let cases = [
            (FileError::AlreadyExists("a.txt".into()), StatusCode::CONFLICT, "file_already_exists"),
            (FileError::EmptyBody, StatusCode::BAD_REQUEST, "invalid_empty_file"),
            (
                FileError::UnsupportedContentType("x/y".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_content_type",
            ),
            (
                FileError::InvalidMetadata(MetadataError::InvalidHeader(MetadataField::IsPublic)),
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_header_file",
            ),
            (FileError::EmptyData("alice".into()), StatusCode::BAD_REQUEST, "delete_empty_data"),
            (
                FileError::ModifiedConcurrently("alice/a.txt".into()),
                StatusCode::CONFLICT,
                "file_modified_concurrently",
            ),
            (
                FileError::Timeout(std::time::Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
                "storage_timeout",
            ),
        ];

        for (err, status, kind) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status_code(), status);
            assert_eq!(app.error_type(), kind);
        }
    }

    #[test]
    fn test_not_public_and_not_found_differ_only_in_kind() {
        let app: AppError = FileError::NotPublic("alice/a.txt".into()).into();
        assert_eq!(app.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(app.error_type(), "file_not_found_or_not_public");
    }

    #[tokio::test]
    async fn test_file_descriptions_name_only_the_file() {
        let response = AppError::from(FileError::NotFound("alice/report.txt".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["description"], "File report.txt is not found");

        let app: AppError = FileError::ModifiedConcurrently("alice/report.txt".into()).into();
        assert!(!app.to_string().contains("alice/"));
    }

    #[test]
    fn test_rate_limit_errors_are_too_many_requests() {
        let app = AppError::RateLimitExceeded("slow down".into());
        assert_eq!(app.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(app.error_type(), "too_many_request");

        let app = AppError::TokenRateLimitExceeded("slow down".into());
        assert_eq!(app.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(app.error_type(), "too_many_request_token");
    }
}
