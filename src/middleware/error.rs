use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie, or one that could not be decoded.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Session exists but its access token could not be refreshed.
    #[error("Session expired")]
    SessionExpired,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated | Self::SessionExpired => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

/// Startup failures: provider validation and config parsing.
impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }
}
