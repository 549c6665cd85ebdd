//! Error types for aigate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for aigate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for aigate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Missing API token")]
    MissingToken,

    #[error("Invalid API token")]
    InvalidToken,

    #[error("Malformed model '{model}': expected 'provider/model'")]
    MalformedModel { model: String },

    #[error("Unknown provider '{name}'")]
    UnknownProvider { name: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The OpenAI-style error type string for this variant.
    fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::MissingToken | Error::InvalidToken => "auth_error",
            Error::MalformedModel { .. } | Error::UnknownProvider { .. } => {
                "invalid_request_error"
            }
            Error::Provider(_) | Error::Upstream(_) => "upstream_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingToken => StatusCode::UNAUTHORIZED,
            Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::MalformedModel { .. } => StatusCode::BAD_REQUEST,
            Error::UnknownProvider { .. } => StatusCode::NOT_FOUND,
            Error::Provider(_) => StatusCode::BAD_GATEWAY,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // OpenAI-compatible error envelope
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
