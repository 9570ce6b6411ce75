//! Client-side reactions to the session view and the one protected API
//! call the demo makes with its access token.

use serde_json::Value;
use url::Url;

use crate::session::{SessionError, SessionView};

/// Longest slice of an error response body echoed back for diagnostics.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// What the client should do given the current session view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Start a new interactive sign-in. The only recovery from a failed refresh.
    SignIn,
    /// Signed in; the protected resource can be fetched with this token.
    FetchAvailable { access_token: String },
    /// No session.
    SignedOut,
}

#[must_use]
pub fn react(view: Option<&SessionView>) -> ClientAction {
    match view {
        None => ClientAction::SignedOut,
        Some(view) if view.error == Some(SessionError::RefreshAccessTokenError) => {
            ClientAction::SignIn
        }
        Some(view) if view.access_token.is_empty() => ClientAction::SignedOut,
        Some(view) => ClientAction::FetchAvailable {
            access_token: view.access_token.clone(),
        },
    }
}

/// Classified failure of a protected resource call.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Access token expired or invalid (HTTP 401): {body}")]
    Unauthorized { body: String },

    #[error("Insufficient permissions to access this resource (HTTP 403): {body}")]
    Forbidden { body: String },

    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request to protected resource failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ResourceError {
    /// Map a non-2xx status and its body to a classified error.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = truncate_body(body);
        match status {
            401 => Self::Unauthorized { body },
            403 => Self::Forbidden { body },
            _ => Self::Status { status, body },
        }
    }

    /// Upstream status, when the resource answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Calls the configured API origin with a bearer token.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    api_url: Url,
    http: reqwest::Client,
}

impl ResourceClient {
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// GET the protected resource.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] classified by status for non-2xx
    /// responses, or [`ResourceError::Transport`] on network failure or
    /// a non-JSON success body.
    pub async fn fetch(&self, access_token: &str) -> Result<Value, ResourceError> {
        let response = self
            .http
            .get(self.api_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ResourceError::from_status(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %error, "Protected resource call failed");
            return Err(error);
        }

        Ok(response.json::<Value>().await?)
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_owned(),
    }
}
