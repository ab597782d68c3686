use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Stable machine-readable error kind
    #[serde(rename = "type")]
    #[schema(example = "file_not_found")]
    pub error_type: String,
    /// Human readable explanation
    pub description: String,
}

impl ApiError {
    pub fn new(error_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            description: description.into(),
        }
    }
}
