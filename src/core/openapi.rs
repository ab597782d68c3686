use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth::{dtos as auth_dtos, handlers as auth_handlers};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::ApiError;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth_handlers::get_guest_token,
        auth_handlers::get_user_info,
        auth_handlers::refresh_token,
        // Files
        files_handlers::list_files,
        files_handlers::get_file,
        files_handlers::get_public_file,
        files_handlers::upload_file,
        files_handlers::update_file,
        files_handlers::delete_file,
        files_handlers::delete_all_files,
    ),
    components(
        schemas(
            // Shared
            ApiError,
            // Auth
            auth_dtos::GuestTokenResponseDto,
            auth_dtos::UserInfoResponseDto,
            auth_dtos::RefreshTokenRequestDto,
            auth_dtos::RefreshTokenResponseDto,
            // Files
            files_dtos::FileResponseDto,
            files_dtos::FileBodyDto,
        )
    ),
    tags(
        (name = "auth", description = "Guest tokens and OAuth2 identity"),
        (name = "files", description = "Temporary file upload and management"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Tempbox API",
        version = "0.1.0",
        description = "Temporary file hosting with expiring links",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_file_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/files/{username}"));
        assert!(paths.contains_key("/files/{username}/{filename}"));
        assert!(paths.contains_key("/files/{username}/public/{filename}"));
        assert!(paths.contains_key("/auth/guest/token"));
    }

    #[test]
    fn test_swagger_info_modifier_overrides_info() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.version, "9.9.9");
    }
}
