use std::sync::Arc;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::auth::clients::{OAuthClient, OAuthTokenResponse};
use crate::features::auth::guest::{self, GuestIdentityIssuer};
use crate::features::auth::model::Identity;

/// Resolves bearer tokens to identities and issues guest tokens
pub struct IdentityService {
    guest_issuer: Arc<GuestIdentityIssuer>,
    oauth_client: Arc<OAuthClient>,
}

impl IdentityService {
    pub fn new(guest_issuer: Arc<GuestIdentityIssuer>, oauth_client: Arc<OAuthClient>) -> Self {
        Self {
            guest_issuer,
            oauth_client,
        }
    }

    fn resolve_guest(&self, token: &str) -> Option<Identity> {
        match self.guest_issuer.parse_token(token) {
            Ok(claims) => Some(Identity::Guest {
                username: claims.jti,
            }),
            Err(e) => {
                debug!("Not a guest token: {}", e);
                None
            }
        }
    }

    async fn resolve_oauth(&self, token: &str) -> Option<Identity> {
        match self.oauth_client.get_account_info(token).await {
            Ok(info) => Some(Identity::OAuth2 {
                username: info.username(),
                email: info.email,
                verified_email: info.verified_email,
            }),
            Err(e) => {
                debug!("Not an OAuth2 token: {}", e);
                None
            }
        }
    }

    /// Try the guest token first, then the identity provider
    pub async fn resolve(&self, token: &str) -> Option<Identity> {
        if token.is_empty() {
            return None;
        }

        if let Some(identity) = self.resolve_guest(token) {
            return Some(identity);
        }
        self.resolve_oauth(token).await
    }

    /// Check that `token` grants access to the files of `owner`
    ///
    /// Guest accounts only accept guest tokens; every other account is checked
    /// against the identity provider.
    pub async fn authorize(&self, token: Option<&str>, owner: &str) -> Result<Identity> {
        let identity = match token.filter(|t| !t.is_empty()) {
            Some(token) if guest::is_guest_username(owner) => self.resolve_guest(token),
            Some(token) => self.resolve_oauth(token).await,
            None => None,
        };

        identity
            .filter(|identity| identity.can_access(owner))
            .ok_or_else(|| {
                AppError::Unauthorized("You don't have right access to this resource".to_string())
            })
    }

    /// Issue a token for a new guest account, unless the caller already holds a valid one
    pub async fn issue_guest_token(&self, current_token: Option<&str>) -> Result<String> {
        if let Some(token) = current_token {
            if self.resolve(token).await.is_some() {
                return Err(AppError::AlreadyHaveToken(
                    "You already have valid token".to_string(),
                ));
            }
        }

        let username = guest::generate_username();
        let token = self
            .guest_issuer
            .create_token(&username)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!("Issued guest token for {}", username);
        Ok(token)
    }

    pub async fn refresh_oauth_token(&self, refresh_token: &str) -> Result<OAuthTokenResponse> {
        Ok(self.oauth_client.refresh_access_token(refresh_token).await?)
    }
}
