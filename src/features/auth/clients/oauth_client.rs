use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::OAuthConfig;

#[derive(Debug, Error)]
pub enum OAuthError {
    /// Provider answered, but refused the token or grant
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

/// Account information returned by the userinfo endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthAccountInfo {
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl OAuthAccountInfo {
    /// Storage username: the email with `@` and `.` replaced by `-`
    pub fn username(&self) -> String {
        username_from_email(&self.email)
    }
}

pub fn username_from_email(email: &str) -> String {
    email.replace(['@', '.'], "-")
}

/// Token endpoint response for a refresh-token grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, rename = "scope")]
    pub scopes: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Client for the third-party OAuth2 identity provider
pub struct OAuthClient {
    config: OAuthConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OAuthError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Look up the account behind an access token
    pub async fn get_account_info(&self, access_token: &str) -> Result<OAuthAccountInfo, OAuthError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Userinfo request refused: HTTP {} - {}", status, body);
            return Err(OAuthError::Rejected(format!("userinfo returned HTTP {}", status)));
        }

        response
            .json::<OAuthAccountInfo>()
            .await
            .map_err(|e| OAuthError::Decode(e.to_string()))
    }

    /// Form-encoded refresh grant for the token endpoint
    fn refresh_request(&self, refresh_token: &str) -> reqwest::RequestBuilder {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        self.http_client.post(&self.config.token_url).form(&form)
    }

    /// Exchange a refresh token for a fresh access token
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let response = self
            .refresh_request(refresh_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach token endpoint: {}", e);
                OAuthError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token endpoint error: HTTP {} - {}", status, body);
            return Err(if status.is_client_error() {
                OAuthError::Rejected("refresh token is not valid".to_string())
            } else {
                OAuthError::Request(format!("token endpoint returned HTTP {}", status))
            });
        }

        response
            .json::<OAuthTokenResponse>()
            .await
            .map_err(|e| OAuthError::Decode(e.to_string()))
    }
}
