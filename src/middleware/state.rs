use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AuthSettings;
use crate::oauth::AuthClient;
use crate::orchestrator::SessionOrchestrator;
use crate::presentation::ResourceClient;

/// Shared state for auth route handlers.
#[derive(Clone)]
pub(super) struct AuthState {
    pub(super) client: Arc<AuthClient>,
    pub(super) orchestrator: SessionOrchestrator<AuthClient>,
    pub(super) resource: ResourceClient,
    pub(super) settings: AuthSettings,
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.settings.cookie_key.clone()
    }
}
