use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::auth::clients::OAuthTokenResponse;

/// Response DTO for a freshly issued guest token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestTokenResponseDto {
    /// Signed guest token, send as `Authorization: Bearer <token>`
    pub access_token: String,
    /// Token lifetime in seconds
    #[schema(example = 604800)]
    pub expires_in: i64,
}

/// Response DTO for the current user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoResponseDto {
    #[schema(example = "alice-gmail-com")]
    pub username: String,
    /// Number of files currently stored by the user
    pub total_files: usize,
}

/// Request DTO for token refresh
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequestDto {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Response DTO for token refresh, mirrors the provider's token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenResponseDto {
    /// New OAuth2 access token
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Space separated scopes
    #[serde(rename = "scope", skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// New refresh token (if rotated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token expiry time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl From<OAuthTokenResponse> for RefreshTokenResponseDto {
    fn from(token: OAuthTokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            scopes: token.scopes,
            id_token: token.id_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        }
    }
}
