//! Guest identity issuer
//!
//! Guest usernames embed their own expiry: `tempbox.anonym-<expiry epoch ms>-<random>`.
//! The dot in the prefix keeps them apart from email-derived usernames, which
//! never contain one.
//! The username travels as the `jti` claim of an HS256 token with a fixed subject.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    GUEST_TOKEN_SUBJECT, GUEST_TOKEN_TTL_SECS, GUEST_USERNAME_PREFIX, GUEST_USERNAME_RANDOM_LEN,
};

#[derive(Debug, Error)]
pub enum GuestTokenError {
    #[error("invalid username `{0}`, must be a guest username")]
    InvalidUsername(String),

    #[error("failed to sign guest token: {0}")]
    Signing(String),

    #[error("invalid guest token: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestClaims {
    pub sub: String,
    /// Guest username
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct GuestIdentityIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl GuestIdentityIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.sub = Some(GUEST_TOKEN_SUBJECT.to_string());
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a 7-day token carrying `username`
    pub fn create_token(&self, username: &str) -> Result<String, GuestTokenError> {
        if !is_guest_username(username) {
            return Err(GuestTokenError::InvalidUsername(username.to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = GuestClaims {
            sub: GUEST_TOKEN_SUBJECT.to_string(),
            jti: username.to_string(),
            iat: now,
            exp: now + GUEST_TOKEN_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GuestTokenError::Signing(e.to_string()))
    }

    /// Verify signature, subject and expiry; any failure yields no claims
    pub fn parse_token(&self, token: &str) -> Result<GuestClaims, GuestTokenError> {
        let data = decode::<GuestClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| GuestTokenError::Invalid(e.to_string()))?;

        if !is_guest_username(&data.claims.jti) {
            return Err(GuestTokenError::Invalid(
                "token does not carry a guest username".to_string(),
            ));
        }

        Ok(data.claims)
    }
}

/// New guest username expiring 7 days from now
pub fn generate_username() -> String {
    username_expiring_at(Utc::now().timestamp_millis() + GUEST_TOKEN_TTL_SECS * 1000)
}

/// Guest username with a random suffix and the given expiry, epoch milliseconds
pub fn username_expiring_at(expires_at: i64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GUEST_USERNAME_RANDOM_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!("{}-{}-{}", GUEST_USERNAME_PREFIX, expires_at, suffix)
}

pub fn is_guest_username(username: &str) -> bool {
    parse_username(username).is_some()
}

/// Expiry embedded in a guest username, epoch milliseconds
pub fn username_expires_at(username: &str) -> Option<i64> {
    parse_username(username).map(|(expires_at, _)| expires_at)
}

/// Split `prefix-<digits>-<lowercase alnum suffix>` into expiry and suffix
fn parse_username(username: &str) -> Option<(i64, &str)> {
    let rest = username.strip_prefix(GUEST_USERNAME_PREFIX)?.strip_prefix('-')?;
    let (expiry, suffix) = rest.split_once('-')?;

    if expiry.is_empty() || !expiry.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if suffix.len() != GUEST_USERNAME_RANDOM_LEN
        || !suffix
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        return None;
    }

    Some((expiry.parse().ok()?, suffix))
}
