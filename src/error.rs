use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Custom error type for gitlab_mattermost_bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Content-Type must be application/json and the request body must contain valid JSON")]
    InvalidBody,

    #[error("Missing or malformed event field: {0}")]
    SchemaViolation(String),

    #[error("Invalid or missing X-Gitlab-Token header")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay destination returned status {status}: {body}")]
    RelayStatus { status: u16, body: String },
}

/// Helper type for Results that use BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::InvalidBody | BridgeError::SchemaViolation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Unauthorized => StatusCode::UNAUTHORIZED,
            BridgeError::ConfigError(_)
            | BridgeError::Http(_)
            | BridgeError::RelayStatus { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
