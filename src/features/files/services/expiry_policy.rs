//! Expiry policy validator
//!
//! A file must never hand out a signed URL that outlives the file, and its
//! deletion deadline must stay within [`AUTO_DELETE_HORIZON`] from now.

use chrono::Utc;
use thiserror::Error;

use crate::shared::constants::{
    AUTO_DELETE_HORIZON, MAX_PRIVATE_URL_EXPIRES_SECS, MIN_PRIVATE_URL_EXPIRES_SECS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpiryPolicyError {
    #[error("private url expires cannot be later than auto delete at starting from now")]
    ExpiryOrder,

    #[error("auto delete at cannot be later than 1 year from now")]
    Horizon,

    #[error("private url expires must be less than 7 days in seconds and more than 2 seconds")]
    Range,
}

pub fn validate_expiry(
    private_url_expires: u64,
    auto_delete_at: i64,
) -> Result<(), ExpiryPolicyError> {
    validate_expiry_at(Utc::now().timestamp_millis(), private_url_expires, auto_delete_at)
}

/// Same as [`validate_expiry`] against an explicit clock reading (epoch ms)
pub fn validate_expiry_at(
    now_ms: i64,
    private_url_expires: u64,
    auto_delete_at: i64,
) -> Result<(), ExpiryPolicyError> {
    let url_deadline = i64::try_from(private_url_expires)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(|ms| now_ms.checked_add(ms))
        .unwrap_or(i64::MAX);
    if url_deadline > auto_delete_at {
        return Err(ExpiryPolicyError::ExpiryOrder);
    }

    let horizon = now_ms.saturating_add(AUTO_DELETE_HORIZON.as_millis() as i64);
    if auto_delete_at >= horizon {
        return Err(ExpiryPolicyError::Horizon);
    }

    if !(MIN_PRIVATE_URL_EXPIRES_SECS..=MAX_PRIVATE_URL_EXPIRES_SECS).contains(&private_url_expires)
    {
        return Err(ExpiryPolicyError::Range);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn test_accepts_url_within_lifetime() {
        assert_eq!(validate_expiry_at(NOW, 10, NOW + 60_000), Ok(()));
        assert_eq!(validate_expiry_at(NOW, 10, NOW + 10_000), Ok(()));
        assert_eq!(validate_expiry_at(NOW, 604_800, NOW + 8 * DAY_MS), Ok(()));
    }

    #[test]
    fn test_rejects_url_outliving_file() {
        assert_eq!(
            validate_expiry_at(NOW, 61, NOW + 60_000),
            Err(ExpiryPolicyError::ExpiryOrder)
        );
        assert_eq!(
            validate_expiry_at(NOW, 10, NOW - 1),
            Err(ExpiryPolicyError::ExpiryOrder)
        );
        assert_eq!(
            validate_expiry_at(NOW, u64::MAX, NOW + DAY_MS),
            Err(ExpiryPolicyError::ExpiryOrder)
        );
    }

    #[test]
    fn test_rejects_deadline_beyond_horizon() {
        let horizon = NOW + AUTO_DELETE_HORIZON.as_millis() as i64;
        assert_eq!(
            validate_expiry_at(NOW, 10, horizon),
            Err(ExpiryPolicyError::Horizon)
        );
        assert_eq!(validate_expiry_at(NOW, 10, horizon - 1), Ok(()));
    }

    #[test]
    fn test_rejects_url_ttl_out_of_range() {
        assert_eq!(
            validate_expiry_at(NOW, 1, NOW + DAY_MS),
            Err(ExpiryPolicyError::Range)
        );
        assert_eq!(
            validate_expiry_at(NOW, 604_801, NOW + 30 * DAY_MS),
            Err(ExpiryPolicyError::Range)
        );
        assert_eq!(validate_expiry_at(NOW, 2, NOW + DAY_MS), Ok(()));
    }
}
