//! Metadata codec
//!
//! Translates between the object store's flat string map and
//! [`LifecycleMetadata`]. Keys are matched case-insensitively since header
//! transport may alter case.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::LifecycleMetadata;
use crate::shared::constants::{HEADER_AUTO_DELETE_AT, HEADER_IS_PUBLIC, HEADER_PRIVATE_URL_EXPIRES};

/// Lifecycle field that failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    AutoDeleteAt,
    PrivateUrlExpires,
    IsPublic,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataField::AutoDeleteAt => "auto_delete_at",
            MetadataField::PrivateUrlExpires => "private_url_expires",
            MetadataField::IsPublic => "is_public",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("{}", invalid_header_message(.0))]
    InvalidHeader(MetadataField),
}

fn invalid_header_message(field: &MetadataField) -> &'static str {
    match field {
        MetadataField::AutoDeleteAt => "auto delete at must be valid integer",
        MetadataField::PrivateUrlExpires => "private url expires must be valid positive integer",
        MetadataField::IsPublic => "is public must be valid boolean or integer",
    }
}

pub fn encode(metadata: &LifecycleMetadata) -> HashMap<String, String> {
    HashMap::from([
        (
            HEADER_AUTO_DELETE_AT.to_string(),
            metadata.auto_delete_at.to_string(),
        ),
        (
            HEADER_PRIVATE_URL_EXPIRES.to_string(),
            metadata.private_url_expires.to_string(),
        ),
        (HEADER_IS_PUBLIC.to_string(), metadata.is_public.to_string()),
    ])
}

pub fn decode(map: &HashMap<String, String>) -> Result<LifecycleMetadata, MetadataError> {
    let lookup = |key: &str| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    };

    let auto_delete_at = lookup(HEADER_AUTO_DELETE_AT)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or(MetadataError::InvalidHeader(MetadataField::AutoDeleteAt))?;

    let private_url_expires = lookup(HEADER_PRIVATE_URL_EXPIRES)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(MetadataError::InvalidHeader(MetadataField::PrivateUrlExpires))?;

    let is_public = lookup(HEADER_IS_PUBLIC)
        .and_then(parse_bool)
        .ok_or(MetadataError::InvalidHeader(MetadataField::IsPublic))?;

    Ok(LifecycleMetadata {
        auto_delete_at,
        private_url_expires,
        is_public,
    })
}

/// Boolean literal first, then integer where zero is false and anything else true
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_reverses_encode() {
        for is_public in [true, false] {
            let meta = LifecycleMetadata {
                auto_delete_at: 1_700_000_000_123,
                private_url_expires: 604_800,
                is_public,
            };
            assert_eq!(decode(&encode(&meta)), Ok(meta));
        }
    }

    #[test]
    fn test_decode_is_case_insensitive_on_keys() {
        let map = headers(&[
            ("File-Auto-Delete-At", "42"),
            ("FILE-PRIVATE-URL-EXPIRES", "10"),
            ("file-is-public", "True"),
        ]);
        let meta = decode(&map).unwrap();
        assert_eq!(meta.auto_delete_at, 42);
        assert_eq!(meta.private_url_expires, 10);
        assert!(meta.is_public);
    }

    #[test]
    fn test_is_public_accepts_integers() {
        let decode_flag = |flag: &str| {
            decode(&headers(&[
                (HEADER_AUTO_DELETE_AT, "1"),
                (HEADER_PRIVATE_URL_EXPIRES, "2"),
                (HEADER_IS_PUBLIC, flag),
            ]))
            .map(|m| m.is_public)
        };

        assert_eq!(decode_flag("0"), Ok(false));
        assert_eq!(decode_flag("1"), Ok(true));
        assert_eq!(decode_flag("7"), Ok(true));
        assert_eq!(decode_flag("-3"), Ok(true));
        assert_eq!(decode_flag("F"), Ok(false));
        assert_eq!(
            decode_flag("yes"),
            Err(MetadataError::InvalidHeader(MetadataField::IsPublic))
        );
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let bad_delete = headers(&[
            (HEADER_AUTO_DELETE_AT, "soon"),
            (HEADER_PRIVATE_URL_EXPIRES, "2"),
            (HEADER_IS_PUBLIC, "true"),
        ]);
        assert_eq!(
            decode(&bad_delete),
            Err(MetadataError::InvalidHeader(MetadataField::AutoDeleteAt))
        );

        let negative_expiry = headers(&[
            (HEADER_AUTO_DELETE_AT, "100"),
            (HEADER_PRIVATE_URL_EXPIRES, "-5"),
            (HEADER_IS_PUBLIC, "true"),
        ]);
        assert_eq!(
            decode(&negative_expiry),
            Err(MetadataError::InvalidHeader(MetadataField::PrivateUrlExpires))
        );

        let missing = headers(&[(HEADER_AUTO_DELETE_AT, "100")]);
        assert!(decode(&missing).is_err());
    }

    #[test]
    fn test_error_message_is_human_readable() {
        let err = MetadataError::InvalidHeader(MetadataField::AutoDeleteAt);
        assert_eq!(err.to_string(), "auto delete at must be valid integer");
    }
}
