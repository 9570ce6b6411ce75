//! Drives the session lifecycle: minting a record on sign-in and serving
//! session reads, refreshing the access token when it has expired.
//!
//! Refresh failures never escape as errors. They are logged and encoded in
//! [`SessionRecord::error`] for the presentation layer to act on.
//!
//! There is no single-flight guard: concurrent reads of the same expired
//! record each make their own refresh call, and the last record written
//! back to the cookie wins.

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::session::{Account, RefreshOutcome, SessionRecord, TokenState};
use crate::types::{TokenResponse, UserProfile};

/// The token endpoint's `refresh_token` grant.
///
/// # Example
///
/// ```rust,ignore
/// impl TokenRefresher for StaticRefresher {
///     async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, Error> {
///         Ok(TokenResponse::new("fresh").with_expires_in(60))
///     }
/// }
/// ```
pub trait TokenRefresher: Send + Sync + 'static {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;
}

pub struct SessionOrchestrator<R> {
    refresher: Arc<R>,
}

// Manual impl: no `R: Clone` bound.
impl<R> Clone for SessionOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            refresher: self.refresher.clone(),
        }
    }
}

impl<R: TokenRefresher> SessionOrchestrator<R> {
    #[must_use]
    pub fn new(refresher: Arc<R>) -> Self {
        Self { refresher }
    }

    /// Initial sign-in completion.
    #[must_use]
    pub fn sign_in(&self, account: Account, user: UserProfile) -> SessionRecord {
        tracing::info!(user = %user.id, expires_at = account.expires_at, "Session created");
        SessionRecord::from_sign_in(account, user)
    }

    /// Serve a session read at `now_ms`.
    ///
    /// Makes at most one token-endpoint call, and only when the access
    /// token has expired and a refresh token is stored.
    pub async fn read(&self, record: SessionRecord, now_ms: i64) -> (SessionRecord, TokenState) {
        match record.read(now_ms, None) {
            (record, TokenState::NeedsRefresh) => {
                let outcome = self.refresh(&record).await;
                record.read(now_ms, Some(outcome))
            }
            (record, TokenState::Errored) => {
                tracing::warn!(user = %record.user.id, "Access token expired and no refresh token is stored");
                (record, TokenState::Errored)
            }
            (record, TokenState::Valid) => {
                tracing::debug!(user = %record.user.id, "Access token still valid");
                (record, TokenState::Valid)
            }
        }
    }

    async fn refresh(&self, record: &SessionRecord) -> RefreshOutcome {
        let Some(refresh_token) = record.refresh_token.as_deref() else {
            return RefreshOutcome::Failed;
        };

        match self.refresher.refresh(refresh_token).await {
            Ok(response) => {
                tracing::info!(
                    user = %record.user.id,
                    expires_in = ?response.expires_in,
                    rotated = response.refresh_token.is_some(),
                    "Access token refreshed"
                );
                RefreshOutcome::Refreshed(response)
            }
            Err(e) => {
                tracing::warn!(user = %record.user.id, error = %e, "Access token refresh failed");
                RefreshOutcome::Failed
            }
        }
    }
}
