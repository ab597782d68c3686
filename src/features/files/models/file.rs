/// A stored file as seen by the lifecycle manager
///
/// `name` holds the full `owner/filename` key until the record is formatted
/// for a client, after which only the filename remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    /// Signed URL, or the stable public path once formatted for a public file
    pub url: String,
    pub content_type: String,
    pub lifecycle: LifecycleMetadata,
    /// Epoch milliseconds, from the store
    pub uploaded_at: i64,
    /// Epoch milliseconds, from the store
    pub updated_at: i64,
    pub size: u64,
}

/// Client-controlled lifecycle policy of a file, round-tripped as object metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleMetadata {
    /// Absolute deletion deadline, epoch milliseconds
    pub auto_delete_at: i64,
    /// Signed URL time-to-live in seconds, counted from each read
    pub private_url_expires: u64,
    pub is_public: bool,
}

impl LifecycleMetadata {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.auto_delete_at <= now_ms
    }
}

/// MIME types accepted at upload time
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/json; charset=utf-8",
    "application/json",
    "text/html; charset=utf-8",
    "text/html",
    "text/plain; charset=utf-8",
    "text/plain",
    "text/javascript; charset=utf-8",
    "text/javascript",
    "application/xml; charset=utf-8",
    "application/xml",
    "text/xml",
    "text/xml; charset=utf-8",
    "text/csv",
    "text/css",
    "video/mpeg",
    "audio/mpeg",
    "application/epub+zip",
    "application/epub",
    "image/gif",
    "image/jpeg",
    "application/pdf",
    "audio/wav",
    "audio/ogg",
    "image/png",
    "application/font-woff",
    "font/woff",
    "font/woff2",
    "application/x-compressed",
    "application/x-7z-compressed",
    // excel
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    // word
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    // powerpoint
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/x-sh",
    "image/svg+xml",
    "application/x-tar",
    "application/x-gzip",
    "application/gzip",
    "image/webp",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/avif",
    "application/wasm",
    "application/x-zip-compressed",
    "application/zip",
];

pub fn is_content_type_accepted(content_type: &str) -> bool {
    ACCEPTED_CONTENT_TYPES.contains(&content_type)
}
