use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::Result;
use crate::core::extractor::{AppBytes, AppQuery};
use crate::features::files::dtos::{FileBodyDto, FileResponseDto, ListFilesQuery};
use crate::features::files::services::{FilePayload, FileService};
use crate::shared::constants::HEADER_FILE_NAME;
use crate::shared::types::ApiError;

/// Request headers as a lowercase-keyed map, first value wins
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_lowercase())
                .or_insert_with(|| value.to_string());
        }
    }
    map
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

/// List files of a user
#[utoipa::path(
    get,
    path = "/files/{username}",
    params(
        ("username" = String, Path, description = "Owner of the files"),
        ListFilesQuery
    ),
    responses(
        (status = 200, description = "Files of the user, possibly empty", body = Vec<FileResponseDto>),
        (status = 304, description = "Unchanged since the given ETag"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 429, description = "Too many requests for this token", body = ApiError),
        (status = 504, description = "Storage timeout", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(service): State<Arc<FileService>>,
    Path(username): Path<String>,
    AppQuery(query): AppQuery<ListFilesQuery>,
) -> Result<Json<Vec<FileResponseDto>>> {
    let records = service.list_files(&username, &query.into()).await?;
    let files = records
        .into_iter()
        .map(|record| service.format(record).into())
        .collect();
    Ok(Json(files))
}

/// Get a single file
#[utoipa::path(
    get,
    path = "/files/{username}/{filename}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("filename" = String, Path, description = "Name of the file")
    ),
    responses(
        (status = 200, description = "File retrieved successfully", body = FileResponseDto),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "File not found", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(service): State<Arc<FileService>>,
    Path((username, filename)): Path<(String, String)>,
) -> Result<Json<FileResponseDto>> {
    let record = service.get_file(&username, &filename).await?;
    Ok(Json(service.format(record).into()))
}

/// Download a public file
///
/// Private and missing files both answer 404.
#[utoipa::path(
    get,
    path = "/files/{username}/public/{filename}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("filename" = String, Path, description = "Name of the file")
    ),
    responses(
        (status = 200, description = "Raw file content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found or not public", body = ApiError)
    ),
    tag = "files"
)]
pub async fn get_public_file(
    State(service): State<Arc<FileService>>,
    Path((username, filename)): Path<(String, String)>,
) -> Result<Response> {
    let (record, data) = service.read_public(&username, &filename).await?;

    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (header::CONTENT_LENGTH, data.len().to_string()),
        ],
        data,
    )
        .into_response())
}

/// Upload a new file
///
/// The body is the raw file content. The target name goes in the `file-name`
/// header and the lifecycle policy in the `file-auto-delete-at`,
/// `file-private-url-expires` and `file-is-public` headers.
#[utoipa::path(
    post,
    path = "/files/{username}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("file-name" = String, Header, description = "Target filename, e.g. report.txt"),
        ("file-auto-delete-at" = i64, Header, description = "Deletion deadline, epoch milliseconds"),
        ("file-private-url-expires" = u64, Header, description = "Signed URL lifetime in seconds"),
        ("file-is-public" = String, Header, description = "true/false or an integer")
    ),
    request_body(content = FileBodyDto, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File uploaded successfully", body = FileResponseDto),
        (status = 400, description = "Empty body or invalid file name", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 409, description = "File already exists", body = ApiError),
        (status = 413, description = "File too large", body = ApiError),
        (status = 415, description = "Unsupported content type", body = ApiError),
        (status = 422, description = "Invalid lifecycle headers", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    AppBytes(body): AppBytes,
) -> Result<(StatusCode, Json<FileResponseDto>)> {
    let file_headers = header_map(&headers);
    let filename = file_headers
        .get(HEADER_FILE_NAME)
        .map(String::as_str)
        .unwrap_or_default();

    let payload = FilePayload {
        content_type: content_type(&headers),
        headers: &file_headers,
        body: &body,
    };
    let record = service.upload_file(&username, filename, payload).await?;

    Ok((StatusCode::CREATED, Json(service.format(record).into())))
}

/// Replace the content and lifecycle policy of an existing file
#[utoipa::path(
    put,
    path = "/files/{username}/{filename}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("filename" = String, Path, description = "Name of the file"),
        ("file-auto-delete-at" = i64, Header, description = "Deletion deadline, epoch milliseconds"),
        ("file-private-url-expires" = u64, Header, description = "Signed URL lifetime in seconds"),
        ("file-is-public" = String, Header, description = "true/false or an integer")
    ),
    request_body(content = FileBodyDto, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File updated successfully", body = FileResponseDto),
        (status = 400, description = "Empty body or mismatching content type", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "File not found", body = ApiError),
        (status = 409, description = "File modified concurrently", body = ApiError),
        (status = 422, description = "Invalid lifecycle headers", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn update_file(
    State(service): State<Arc<FileService>>,
    Path((username, filename)): Path<(String, String)>,
    headers: HeaderMap,
    AppBytes(body): AppBytes,
) -> Result<Json<FileResponseDto>> {
    let file_headers = header_map(&headers);
    let payload = FilePayload {
        content_type: content_type(&headers),
        headers: &file_headers,
        body: &body,
    };
    let record = service.update_file(&username, &filename, payload).await?;

    Ok(Json(service.format(record).into()))
}

/// Delete a single file
#[utoipa::path(
    delete,
    path = "/files/{username}/{filename}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("filename" = String, Path, description = "Name of the file")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "File not found", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(service): State<Arc<FileService>>,
    Path((username, filename)): Path<(String, String)>,
) -> Result<StatusCode> {
    service.delete_file(&username, &filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every file of a user
#[utoipa::path(
    delete,
    path = "/files/{username}",
    params(("username" = String, Path, description = "Owner of the files")),
    responses(
        (status = 204, description = "All files deleted"),
        (status = 400, description = "Nothing to delete", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn delete_all_files(
    State(service): State<Arc<FileService>>,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    service.delete_all_files(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}
