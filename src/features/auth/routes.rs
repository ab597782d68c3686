use crate::core::middleware::{
    etag_middleware, guest_token_rate_limit_middleware, user_rate_limit_middleware,
};
use crate::core::rate_limit::RateLimiters;
use crate::features::auth::handlers::{self, AuthState};
use crate::features::auth::services::IdentityService;
use crate::features::files::FileService;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Auth routes; each handler resolves the bearer token itself
pub fn routes(
    identity_service: Arc<IdentityService>,
    file_service: Arc<FileService>,
    limiters: RateLimiters,
) -> Router {
    let state = AuthState {
        identity_service,
        file_service,
    };

    Router::new()
        .route(
            "/auth/guest/token",
            get(handlers::get_guest_token).layer(from_fn_with_state(
                limiters.guest_token,
                guest_token_rate_limit_middleware,
            )),
        )
        .route(
            "/auth/userinfo/me",
            get(handlers::get_user_info)
                .layer(from_fn(etag_middleware))
                .layer(from_fn_with_state(limiters.user, user_rate_limit_middleware)),
        )
        .route("/auth/oauth2/token", post(handlers::refresh_token))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::shared::test_helpers::{body_json, guest_token, request, TestApp};
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_guest_token_flow() {
        let app = TestApp::new();

        let issued = app
            .router()
            .oneshot(request(Method::GET, "/auth/guest/token", None))
            .await
            .unwrap();
        assert_eq!(issued.status(), StatusCode::OK);
        let body = body_json(issued).await;
        assert_eq!(body["expiresIn"], 604_800);
        let token = body["accessToken"].as_str().unwrap().to_string();

        let again = app
            .router()
            .oneshot(request(Method::GET, "/auth/guest/token", Some(&token)))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(again).await["type"], "already_have_valid_token");

        let me = app
            .router()
            .oneshot(request(Method::GET, "/auth/userinfo/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        let me = body_json(me).await;
        assert!(me["username"].as_str().unwrap().starts_with("tempbox.anonym-"));
        assert_eq!(me["totalFiles"], 0);
    }

    #[tokio::test]
    async fn test_guest_token_rate_limited_per_address() {
        let app = TestApp::new();
        let from = |ip: &str| {
            let mut req = request(Method::GET, "/auth/guest/token", None);
            req.headers_mut().insert("x-real-ip", ip.parse().unwrap());
            req
        };

        for _ in 0..3 {
            let issued = app.router().oneshot(from("10.0.0.1")).await.unwrap();
            assert_eq!(issued.status(), StatusCode::OK);
        }

        let limited = app.router().oneshot(from("10.0.0.1")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(limited).await["type"], "too_many_request_token");

        let other = app.router().oneshot(from("10.0.0.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_userinfo_carries_etag() {
        let app = TestApp::new();
        let (_, token) = guest_token(&app);

        let me = app
            .router()
            .oneshot(request(Method::GET, "/auth/userinfo/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        let etag = me.headers()[header::ETAG].clone();

        let mut again = request(Method::GET, "/auth/userinfo/me", Some(&token));
        again.headers_mut().insert(header::IF_NONE_MATCH, etag);
        let again = app.router().oneshot(again).await.unwrap();
        assert_eq!(again.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_userinfo_without_token_is_invalid() {
        let app = TestApp::new();

        let response = app
            .router()
            .oneshot(request(Method::GET, "/auth/userinfo/me", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["type"], "invalid_token");
    }

    #[tokio::test]
    async fn test_wrong_method_uses_error_shape() {
        let app = TestApp::new();

        let response = app
            .router()
            .oneshot(request(Method::DELETE, "/auth/guest/token", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["type"], "method_not_allowed");
    }
}
