#[cfg(test)]
use crate::core::config::{OAuthConfig, RateLimitConfig};
#[cfg(test)]
use crate::core::rate_limit::RateLimiters;
#[cfg(test)]
use crate::features::auth::{clients::OAuthClient, guest, GuestIdentityIssuer, IdentityService};
#[cfg(test)]
use crate::features::files::FileService;
#[cfg(test)]
use crate::modules::storage::{MemoryObjectStore, ObjectStore};
#[cfg(test)]
use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
pub const TEST_BASE_URL: &str = "http://localhost:8080";

#[cfg(test)]
pub const TEST_JWT_SECRET: &str = "test-secret";

/// A day from now outlives the one-hour signed URL and stays inside the horizon
#[cfg(test)]
pub const FAR_DEADLINE_OFFSET_MS: i64 = 86_400_000;

#[cfg(test)]
pub const TEST_PUBLIC_CACHE_MAX_AGE: Duration = Duration::from_secs(10);

/// Full API router over an in-memory store
#[cfg(test)]
pub struct TestApp {
    pub store: Arc<MemoryObjectStore>,
    pub file_service: Arc<FileService>,
    pub issuer: Arc<GuestIdentityIssuer>,
    pub identity_service: Arc<IdentityService>,
    /// Shared by every router built from this app
    pub limiters: RateLimiters,
}

#[cfg(test)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_rate_limits(RateLimitConfig::default())
    }

    pub fn with_rate_limits(rate_limit: RateLimitConfig) -> Self {
        let store = Arc::new(MemoryObjectStore::new(TEST_BASE_URL));
        let file_service = Arc::new(FileService::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            TEST_BASE_URL,
            Duration::from_secs(5),
            4,
        ));
        let issuer = Arc::new(GuestIdentityIssuer::new(TEST_JWT_SECRET));
        // Nothing listens on port 9, so OAuth tokens never resolve
        let oauth_client = Arc::new(OAuthClient::new(OAuthConfig {
            userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
            token_url: "http://127.0.0.1:9/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout: Duration::from_secs(1),
        })
        .expect("OAuth client should build"));
        let identity_service = Arc::new(IdentityService::new(Arc::clone(&issuer), oauth_client));

        Self {
            store,
            file_service,
            issuer,
            identity_service,
            limiters: RateLimiters::from_config(&rate_limit),
        }
    }

    pub fn router(&self) -> Router {
        crate::api_router(
            Arc::clone(&self.file_service),
            Arc::new(self.file_service.with_timeout(Duration::from_secs(5))),
            Arc::clone(&self.identity_service),
            self.limiters.clone(),
            TEST_PUBLIC_CACHE_MAX_AGE,
        )
    }
}

/// Fresh guest username with a matching signed token
#[cfg(test)]
pub fn guest_token(app: &TestApp) -> (String, String) {
    let username = guest::generate_username();
    let token = app
        .issuer
        .create_token(&username)
        .expect("guest token should be issued");
    (username, token)
}

#[cfg(test)]
pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request should build")
}

#[cfg(test)]
pub fn upload_request(
    username: &str,
    token: &str,
    filename: &str,
    content_type: &str,
    auto_delete_at: i64,
    is_public: bool,
    body: &[u8],
) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("/files/{}", username))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .header("file-name", filename)
        .header("file-auto-delete-at", auto_delete_at.to_string())
        .header("file-private-url-expires", "3600")
        .header("file-is-public", is_public.to_string())
        .body(Body::from(body.to_vec()))
        .expect("request should build")
}

#[cfg(test)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
