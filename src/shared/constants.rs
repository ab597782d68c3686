use std::time::Duration;

// =============================================================================
// FILE METADATA HEADERS
// =============================================================================

// Lowercase on purpose: HTTP/2 header names are lowercase and object-store
// metadata keys are normalized to lowercase before lookup.

/// Absolute deletion deadline, epoch milliseconds
pub const HEADER_AUTO_DELETE_AT: &str = "file-auto-delete-at";

/// Signed URL time-to-live, seconds
pub const HEADER_PRIVATE_URL_EXPIRES: &str = "file-private-url-expires";

/// Visibility flag, `true`/`false` or an integer
pub const HEADER_IS_PUBLIC: &str = "file-is-public";

/// Target filename on upload
pub const HEADER_FILE_NAME: &str = "file-name";

// =============================================================================
// EXPIRY POLICY
// =============================================================================

/// Upper bound for `autoDeleteAt`, measured from now (365.25 days)
pub const AUTO_DELETE_HORIZON: Duration = Duration::from_secs(8766 * 3600);

/// Smallest accepted signed URL lifetime in seconds
pub const MIN_PRIVATE_URL_EXPIRES_SECS: u64 = 2;

/// Largest accepted signed URL lifetime in seconds (7 days)
pub const MAX_PRIVATE_URL_EXPIRES_SECS: u64 = 604_800;

// =============================================================================
// GUEST IDENTITY
// =============================================================================

/// Prefix shared by every generated guest username. Email-derived usernames
/// have every `.` replaced, so they can never start with it.
pub const GUEST_USERNAME_PREFIX: &str = "tempbox.anonym";

/// Fixed subject claim of guest tokens
pub const GUEST_TOKEN_SUBJECT: &str = "guest";

/// Lifetime of both the guest account and its token (7 days)
pub const GUEST_TOKEN_TTL_SECS: i64 = 604_800;

/// Length of the random suffix in guest usernames
pub const GUEST_USERNAME_RANDOM_LEN: usize = 18;

pub const BEARER_PREFIX: &str = "Bearer ";

// =============================================================================
// CLIENT ADDRESS
// =============================================================================

/// Client address headers set by a reverse proxy, checked in order
pub const HEADER_REAL_IP: &str = "real-ip";
pub const HEADER_X_REAL_IP: &str = "x-real-ip";

// =============================================================================
// ERROR TYPES
// =============================================================================

pub const ERROR_TYPE_FILE_NOT_PUBLIC: &str = "file_not_found_or_not_public";
pub const ERROR_TYPE_FILE_NOT_FOUND: &str = "file_not_found";
pub const ERROR_TYPE_HAVE_TOKEN: &str = "already_have_valid_token";
pub const ERROR_TYPE_INVALID_TOKEN: &str = "invalid_token";
pub const ERROR_TYPE_UNAUTHORIZED: &str = "unauthorized";
pub const ERROR_TYPE_EMPTY_DATA: &str = "delete_empty_data";
pub const ERROR_TYPE_INVALID_HEADER_FILE: &str = "invalid_header_file";
pub const ERROR_TYPE_EMPTY_FILE: &str = "invalid_empty_file";
pub const ERROR_TYPE_MISMATCH_TYPE: &str = "mismatch_content_type";
pub const ERROR_TYPE_FILE_EXISTS: &str = "file_already_exists";
pub const ERROR_TYPE_FILE_MODIFIED: &str = "file_modified_concurrently";
pub const ERROR_TYPE_INVALID_FILE_NAME: &str = "invalid_file_name";
pub const ERROR_TYPE_UNSUPPORTED_TYPE: &str = "unsupported_content_type";
pub const ERROR_TYPE_BAD_REQUEST: &str = "bad_request";
pub const ERROR_TYPE_RESOURCE_NOT_FOUND: &str = "resource_not_found";
pub const ERROR_TYPE_METHOD_NOT_ALLOWED: &str = "method_not_allowed";
pub const ERROR_TYPE_ENTITY_TOO_LARGE: &str = "request_entity_too_large";
pub const ERROR_TYPE_STORAGE_TIMEOUT: &str = "storage_timeout";
pub const ERROR_TYPE_TOO_MANY_REQUEST: &str = "too_many_request";
pub const ERROR_TYPE_TOO_MANY_REQUEST_TOKEN: &str = "too_many_request_token";
pub const ERROR_TYPE_EXTERNAL_SERVICE: &str = "external_service_error";
pub const ERROR_TYPE_UNKNOWN: &str = "unknown_server_error";
