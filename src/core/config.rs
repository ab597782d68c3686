use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub oauth: OAuthConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build public file links
    pub server_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    /// `max-age` sent with public downloads
    pub public_cache_max_age: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Memory,
}

/// Object store configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Deadline for a single file operation
    pub operation_timeout: Duration,
    /// Deadline for the purge pre-checks attached to each request
    pub purge_timeout: Duration,
    /// Maximum number of per-object store calls in flight for bulk operations
    pub max_concurrency: usize,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for guest tokens
    pub jwt_secret: String,
}

/// OAuth2 identity provider endpoints and client credentials
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub userinfo_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

/// Per-second request budgets
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Per bearer credential on authenticated routes
    pub requests_per_second: u32,
    /// Per client address on guest token issuance
    pub guest_token_per_second: u32,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            oauth: OAuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 30 * 1024 * 1024; // 30MB
    const DEFAULT_PUBLIC_CACHE_MAX_AGE_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let server_url = env::var("SERVER_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let public_cache_max_age_secs = env::var("PUBLIC_CACHE_MAX_AGE_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_PUBLIC_CACHE_MAX_AGE_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "PUBLIC_CACHE_MAX_AGE_SECS must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            server_url,
            cors_allowed_origins,
            max_request_body_size,
            public_cache_max_age: Duration::from_secs(public_cache_max_age_secs),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 25;
    const DEFAULT_PURGE_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_MAX_CONCURRENCY: usize = 8;

    pub fn from_env() -> Result<Self, String> {
        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" | "minio" => StorageBackend::S3,
            "memory" => StorageBackend::Memory,
            other => return Err(format!("Unsupported STORAGE_BACKEND: {}", other)),
        };

        let endpoint =
            env::var("STORAGE_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());
        let access_key =
            env::var("STORAGE_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key =
            env::var("STORAGE_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "tempbox-files".to_string());
        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let operation_timeout_secs = env::var("STORAGE_OPERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_OPERATION_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "STORAGE_OPERATION_TIMEOUT_SECS must be a valid number".to_string())?;

        let purge_timeout_secs = env::var("STORAGE_PURGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_PURGE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "STORAGE_PURGE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_concurrency = env::var("STORAGE_MAX_CONCURRENCY")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONCURRENCY.to_string())
            .parse::<usize>()
            .map_err(|_| "STORAGE_MAX_CONCURRENCY must be a valid number".to_string())?
            .max(1);

        Ok(Self {
            backend,
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            operation_timeout: Duration::from_secs(operation_timeout_secs),
            purge_timeout: Duration::from_secs(purge_timeout_secs),
            max_concurrency,
        })
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "JWT_SECRET_KEY environment variable is required".to_string())?;

        Ok(Self { jwt_secret })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .finish()
    }
}

impl OAuthConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let userinfo_url = env::var("OAUTH2_USERINFO_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/userinfo/v2/me".to_string());
        let token_url = env::var("OAUTH2_TOKEN_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());
        let client_id = env::var("OAUTH2_CLIENT_ID").unwrap_or_default();
        let client_secret = env::var("OAUTH2_CLIENT_SECRET").unwrap_or_default();

        let timeout_secs = env::var("OAUTH2_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "OAUTH2_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            userinfo_url,
            token_url,
            client_id,
            client_secret,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl RateLimitConfig {
    const DEFAULT_REQUESTS_PER_SECOND: u32 = 30;
    const DEFAULT_GUEST_TOKEN_PER_SECOND: u32 = 3;

    pub fn from_env() -> Result<Self, String> {
        let requests_per_second = env::var("RATE_LIMIT_REQUESTS_PER_SECOND")
            .unwrap_or_else(|_| Self::DEFAULT_REQUESTS_PER_SECOND.to_string())
            .parse::<u32>()
            .map_err(|_| "RATE_LIMIT_REQUESTS_PER_SECOND must be a valid number".to_string())?;

        let guest_token_per_second = env::var("RATE_LIMIT_GUEST_TOKEN_PER_SECOND")
            .unwrap_or_else(|_| Self::DEFAULT_GUEST_TOKEN_PER_SECOND.to_string())
            .parse::<u32>()
            .map_err(|_| "RATE_LIMIT_GUEST_TOKEN_PER_SECOND must be a valid number".to_string())?;

        Ok(Self {
            requests_per_second,
            guest_token_per_second,
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: Self::DEFAULT_REQUESTS_PER_SECOND,
            guest_token_per_second: Self::DEFAULT_GUEST_TOKEN_PER_SECOND,
        }
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Tempbox API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Temporary file hosting with expiring links".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}
