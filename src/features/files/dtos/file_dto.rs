use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::files::models::FileRecord;
use crate::features::files::services::FileFilter;

/// Response DTO for a stored file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponseDto {
    /// Filename, without the owner segment
    #[schema(example = "report.txt")]
    pub name: String,
    /// Signed URL for private files, stable public URL for public files
    pub url: String,
    #[schema(example = "text/plain")]
    pub content_type: String,
    /// Deletion deadline, epoch milliseconds
    pub auto_delete_at: i64,
    /// Signed URL lifetime in seconds, counted from each read
    pub private_url_expires: u64,
    pub is_public: bool,
    /// Epoch milliseconds
    pub uploaded_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
    /// Size of the file in bytes
    pub size: u64,
}

impl From<FileRecord> for FileResponseDto {
    fn from(record: FileRecord) -> Self {
        Self {
            name: record.name,
            url: record.url,
            content_type: record.content_type,
            auto_delete_at: record.lifecycle.auto_delete_at,
            private_url_expires: record.lifecycle.private_url_expires,
            is_public: record.lifecycle.is_public,
            uploaded_at: record.uploaded_at,
            updated_at: record.updated_at,
            size: record.size,
        }
    }
}

/// Query filters for listing files
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Exact size in bytes (ignored when 0)
    pub size: Option<u64>,
    /// Substring of the filename
    pub name: Option<String>,
    /// Substring of the content type
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    /// Maximum number of files returned (ignored when 0)
    pub limit: Option<usize>,
}

impl From<ListFilesQuery> for FileFilter {
    fn from(query: ListFilesQuery) -> Self {
        Self {
            size: query.size,
            name: query.name,
            content_type: query.content_type,
            limit: query.limit,
        }
    }
}

/// Raw file upload body, documented for Swagger UI only
///
/// Lifecycle policy travels in the `file-*` request headers.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct FileBodyDto {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::LifecycleMetadata;

    #[test]
    fn test_response_uses_camel_case() {
        let dto = FileResponseDto::from(FileRecord {
            name: "report.txt".into(),
            url: "http://h/files/alice/public/report.txt".into(),
            content_type: "text/plain".into(),
            lifecycle: LifecycleMetadata {
                auto_delete_at: 10,
                private_url_expires: 2,
                is_public: true,
            },
            uploaded_at: 1,
            updated_at: 2,
            size: 3,
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["contentType"], "text/plain");
        assert_eq!(json["autoDeleteAt"], 10);
        assert_eq!(json["privateUrlExpires"], 2);
        assert_eq!(json["isPublic"], true);
        assert_eq!(json["uploadedAt"], 1);
    }
}
