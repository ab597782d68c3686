use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::core::middleware::{
    etag_middleware, files_auth_middleware, public_cache_layer, purge_middleware,
    user_rate_limit_middleware,
};
use crate::core::rate_limit::RateLimiter;
use crate::features::auth::IdentityService;
use crate::features::files::handlers::{
    delete_all_files, delete_file, get_file, get_public_file, list_files, update_file, upload_file,
};
use crate::features::files::services::FileService;

/// Create routes for the files feature
///
/// `purge_service` shares the store with `file_service` but runs under the
/// shorter purge deadline. Protected routes run purge, then auth, then the
/// per-user rate limit, so an expired guest account is purged even when its
/// request is rejected.
pub fn routes(
    file_service: Arc<FileService>,
    purge_service: Arc<FileService>,
    identity_service: Arc<IdentityService>,
    user_limiter: Arc<RateLimiter>,
    public_cache_max_age: Duration,
) -> Router {
    // route_layer: the last layer added runs first
    let protected = Router::new()
        .route(
            "/files/{username}",
            get(list_files)
                .layer(from_fn(etag_middleware))
                .post(upload_file)
                .delete(delete_all_files),
        )
        .route(
            "/files/{username}/{filename}",
            get(get_file)
                .layer(from_fn(etag_middleware))
                .put(update_file)
                .delete(delete_file),
        )
        .route_layer(from_fn_with_state(user_limiter, user_rate_limit_middleware))
        .route_layer(from_fn_with_state(identity_service, files_auth_middleware))
        .route_layer(from_fn_with_state(
            Arc::clone(&purge_service),
            purge_middleware,
        ));

    let public = Router::new()
        .route(
            "/files/{username}/public/{filename}",
            get(get_public_file).layer(public_cache_layer(public_cache_max_age)),
        )
        .route_layer(from_fn_with_state(purge_service, purge_middleware));

    protected.merge(public).with_state(file_service)
}
