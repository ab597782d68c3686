//! `owner/filename` object key convention

use thiserror::Error;

use super::FileRecord;

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectPathError {
    #[error("object key `{0}` is not in owner/filename form")]
    Malformed(String),

    #[error("owner and filename must not be empty")]
    EmptySegment,
}

/// Build the key for `filename` under `owner`
pub fn join(owner: &str, filename: &str) -> Result<String, ObjectPathError> {
    if owner.is_empty() || filename.is_empty() {
        return Err(ObjectPathError::EmptySegment);
    }
    Ok(format!("{}{}{}", owner, SEPARATOR, filename))
}

/// Split on the first separator only
pub fn split(key: &str) -> Result<(&str, &str), ObjectPathError> {
    key.split_once(SEPARATOR)
        .ok_or_else(|| ObjectPathError::Malformed(key.to_string()))
}

/// Listing prefix that only matches keys owned by `owner`
pub fn owner_prefix(owner: &str) -> String {
    format!("{}{}", owner, SEPARATOR)
}

/// Stable, unsigned route serving a public file
pub fn public_url(base_url: &str, owner: &str, filename: &str) -> String {
    format!(
        "{}/files/{}/public/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(owner),
        urlencoding::encode(filename)
    )
}

/// Prepare a record for clients: strip the owner segment and, for public
/// files, swap the signed URL for the public route. Applying it twice is a no-op.
pub fn format_record(mut record: FileRecord, base_url: &str) -> FileRecord {
    let Some((owner, filename)) = record.name.split_once(SEPARATOR) else {
        return record;
    };

    if record.lifecycle.is_public {
        record.url = public_url(base_url, owner, filename);
    }
    record.name = filename.to_string();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::LifecycleMetadata;

    fn record(name: &str, is_public: bool) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            url: "https://store.local/signed?sig=abc".to_string(),
            content_type: "text/plain".to_string(),
            lifecycle: LifecycleMetadata {
                auto_delete_at: 10_000,
                private_url_expires: 10,
                is_public,
            },
            uploaded_at: 1,
            updated_at: 2,
            size: 3,
        }
    }

    #[test]
    fn test_join_and_split() {
        let key = join("alice", "report.txt").unwrap();
        assert_eq!(key, "alice/report.txt");
        assert_eq!(split(&key).unwrap(), ("alice", "report.txt"));
        assert_eq!(join("", "report.txt"), Err(ObjectPathError::EmptySegment));
    }

    #[test]
    fn test_split_uses_first_separator() {
        assert_eq!(split("alice/dir/report.txt").unwrap(), ("alice", "dir/report.txt"));
        assert!(matches!(split("no-separator"), Err(ObjectPathError::Malformed(_))));
    }

    #[test]
    fn test_format_public_record_uses_public_route() {
        let formatted = format_record(record("alice/report.txt", true), "http://localhost:3000/");
        assert_eq!(formatted.name, "report.txt");
        assert_eq!(formatted.url, "http://localhost:3000/files/alice/public/report.txt");
    }

    #[test]
    fn test_format_private_record_keeps_signed_url() {
        let formatted = format_record(record("alice/report.txt", false), "http://localhost:3000");
        assert_eq!(formatted.name, "report.txt");
        assert_eq!(formatted.url, "https://store.local/signed?sig=abc");
    }

    #[test]
    fn test_format_is_idempotent() {
        for is_public in [true, false] {
            let once = format_record(record("alice/report.txt", is_public), "http://h");
            let twice = format_record(once.clone(), "http://h");
            assert_eq!(once, twice);
        }
    }
}
