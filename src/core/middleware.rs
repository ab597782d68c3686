use crate::core::error::AppError;
use crate::core::extractor::BearerToken;
use crate::core::rate_limit::RateLimiter;
use crate::features::auth::IdentityService;
use crate::features::files::FileService;
use crate::shared::constants::{HEADER_REAL_IP, HEADER_X_REAL_IP};
use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

/// Authorize the bearer token against the `{username}` the route addresses
///
/// The resolved identity is inserted into request extensions.
pub async fn files_auth_middleware(
    State(identity_service): State<Arc<IdentityService>>,
    Path(params): Path<HashMap<String, String>>,
    token: BearerToken,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let owner = params
        .get("username")
        .ok_or_else(|| AppError::Unauthorized("Missing username".to_string()))?;

    let identity = identity_service.authorize(token.as_deref(), owner).await?;
    tracing::debug!("Authorized {} for files of {}", identity.username(), owner);

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Purge expired files and expired guest accounts of the addressed owner
/// before the request is handled. Never fails the request.
pub async fn purge_middleware(
    State(purge_service): State<Arc<FileService>>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(owner) = params.get("username") {
        if purge_service.purge_anonymous_account(owner).await == 0 {
            purge_service.purge_expired(owner).await;
        }
    }

    next.run(req).await
}

/// Per-credential budget, keyed by the raw `Authorization` header
pub async fn user_rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !limiter.check(&key).await {
        tracing::debug!("User rate limit reached on {}", req.uri().path());
        return Err(AppError::RateLimitExceeded(format!(
            "Maximum request exceeded, maximum {} requests per second for user",
            limiter.max_requests()
        )));
    }

    Ok(next.run(req).await)
}

/// Per-address budget for guest token issuance
pub async fn guest_token_rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_address(&req);

    if !limiter.check(&key).await {
        tracing::warn!("Guest token rate limit reached for {}", key);
        return Err(AppError::TokenRateLimitExceeded(format!(
            "Maximum request exceeded, maximum {} requests per second for guest token",
            limiter.max_requests()
        )));
    }

    Ok(next.run(req).await)
}

/// Proxy-provided address headers first, then the peer address
fn client_address(req: &Request) -> String {
    [HEADER_REAL_IP, HEADER_X_REAL_IP]
        .iter()
        .find_map(|name| {
            req.headers()
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_default()
}

/// Tag successful responses with a body-derived `ETag` and answer
/// `304 Not Modified` when `If-None-Match` already carries it
pub async fn etag_middleware(req: Request, next: Next) -> Response {
    let if_none_match = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("Failed to buffer response body: {}", e))
                .into_response()
        }
    };

    let etag = body_etag(&bytes);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        parts.headers.insert(header::ETAG, value);
    }

    if if_none_match.is_some_and(|tags| etag_matches(&tags, &etag)) {
        parts.status = StatusCode::NOT_MODIFIED;
        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.remove(header::CONTENT_TYPE);
        return Response::from_parts(parts, Body::empty());
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// `"<length>-<first 8 bytes of sha256, hex>"`
fn body_etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("\"{}-{}\"", body.len(), hex::encode(&digest[..8]))
}

/// Weak comparison over a comma-separated `If-None-Match` list
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let strip = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let etag = strip(etag);
    if_none_match
        .split(',')
        .any(|tag| tag.trim() == "*" || strip(tag) == etag)
}

/// `Cache-Control: public, max-age=<secs>` on successful responses
pub fn public_cache_layer(
    max_age: Duration,
) -> SetResponseHeaderLayer<impl Fn(&Response) -> Option<HeaderValue> + Clone> {
    let value = HeaderValue::from_str(&format!("public, max-age={}", max_age.as_secs())).ok();
    SetResponseHeaderLayer::if_not_present(header::CACHE_CONTROL, move |res: &Response| {
        if res.status().is_success() {
            value.clone()
        } else {
            None
        }
    })
}

pub async fn not_found_fallback() -> AppError {
    AppError::ResourceNotFound("Resource not found".to_string())
}

pub async fn method_not_allowed_fallback() -> AppError {
    AppError::MethodNotAllowed("Method not allowed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_etag_is_stable_and_content_sensitive() {
        let first = body_etag(b"[]");
        assert_eq!(first, body_etag(b"[]"));
        assert_ne!(first, body_etag(b"[1]"));
        assert!(first.starts_with("\"2-"));
        assert!(first.ends_with('"'));
    }

    #[test]
    fn test_etag_matches_lists_and_weak_tags() {
        let etag = body_etag(b"hello");
        assert!(etag_matches(&etag, &etag));
        assert!(etag_matches(&format!("\"other\", W/{}", etag), &etag));
        assert!(etag_matches("*", &etag));
        assert!(!etag_matches("\"other\"", &etag));
    }

    #[test]
    fn test_client_address_prefers_proxy_headers() {
        let req = axum::http::Request::builder()
            .header(HEADER_X_REAL_IP, "10.0.0.2")
            .header(HEADER_REAL_IP, "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&req), "10.0.0.1");

        let mut req = axum::http::Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 4000))));
        assert_eq!(client_address(&req), "192.168.1.7");

        let req = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_address(&req), "");
    }
}
