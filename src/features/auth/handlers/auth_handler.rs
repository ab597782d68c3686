use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, BearerToken};
use crate::features::auth::dtos::{
    GuestTokenResponseDto, RefreshTokenRequestDto, RefreshTokenResponseDto, UserInfoResponseDto,
};
use crate::features::auth::services::IdentityService;
use crate::features::files::FileService;
use crate::shared::constants::GUEST_TOKEN_TTL_SECS;
use crate::shared::types::ApiError;

/// State for auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub identity_service: Arc<IdentityService>,
    pub file_service: Arc<FileService>,
}

/// Issue a guest token for a new anonymous account
///
/// Refused when the caller already presents a valid guest or OAuth2 token.
#[utoipa::path(
    get,
    path = "/auth/guest/token",
    responses(
        (status = 200, description = "Guest token issued", body = GuestTokenResponseDto),
        (status = 400, description = "Caller already has a valid token", body = ApiError),
        (status = 429, description = "Too many guest token requests from this address", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn get_guest_token(
    State(state): State<AuthState>,
    bearer: BearerToken,
) -> Result<Json<GuestTokenResponseDto>> {
    let access_token = state
        .identity_service
        .issue_guest_token(bearer.as_deref())
        .await?;

    Ok(Json(GuestTokenResponseDto {
        access_token,
        expires_in: GUEST_TOKEN_TTL_SECS,
    }))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/auth/userinfo/me",
    responses(
        (status = 200, description = "Current user retrieved successfully", body = UserInfoResponseDto),
        (status = 304, description = "Unchanged since the given ETag"),
        (status = 400, description = "Token is not valid", body = ApiError),
        (status = 429, description = "Too many requests for this token", body = ApiError)
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user_info(
    State(state): State<AuthState>,
    bearer: BearerToken,
) -> Result<Json<UserInfoResponseDto>> {
    let identity = match bearer.as_deref() {
        Some(token) => state.identity_service.resolve(token).await,
        None => None,
    }
    .ok_or_else(|| {
        AppError::InvalidToken("Token is not valid, cannot get user info".to_string())
    })?;

    let total_files = state.file_service.count_files(identity.username()).await?;

    Ok(Json(UserInfoResponseDto {
        username: identity.username().to_string(),
        total_files,
    }))
}

/// Refresh an OAuth2 access token using a refresh token
#[utoipa::path(
    post,
    path = "/auth/oauth2/token",
    request_body = RefreshTokenRequestDto,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshTokenResponseDto),
        (status = 400, description = "Invalid or expired refresh token", body = ApiError),
        (status = 502, description = "Identity provider unavailable", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AuthState>,
    AppJson(dto): AppJson<RefreshTokenRequestDto>,
) -> Result<Json<RefreshTokenResponseDto>> {
    dto.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = state
        .identity_service
        .refresh_oauth_token(&dto.refresh_token)
        .await?;
    Ok(Json(token.into()))
}
