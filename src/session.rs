//! Session Record, its browser-facing projection and the pure token
//! lifecycle transitions.
//!
//! A [`SessionRecord`] is a value: every operation consumes the current
//! record and returns its replacement. Nothing here performs I/O; the
//! refresh call itself lives in [`crate::orchestrator`].

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{TokenResponse, UserProfile};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Error flag carried by a degraded session. The browser reacts to it by
/// starting a fresh interactive sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshAccessTokenError,
}

/// Where a record stands relative to the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Access token still valid; reads are served without network calls.
    Valid,
    /// Expired, and a refresh token is available.
    NeedsRefresh,
    /// Expired with no way to refresh, or the last refresh failed.
    Errored,
}

/// Result of one call to the token endpoint's `refresh_token` grant.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Refreshed(TokenResponse),
    Failed,
}

/// Tokens obtained from one authorization-code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    /// Absolute expiry, seconds since the epoch.
    pub expires_at: i64,
}

impl Account {
    /// Anchor the relative `expires_in` of a token response at `now_secs`.
    #[must_use]
    pub fn from_token_response(response: TokenResponse, now_secs: i64) -> Self {
        let lifetime = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            id_token: response.id_token,
            expires_at: now_secs.saturating_add(i64::try_from(lifetime).unwrap_or(i64::MAX)),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Server-side session state, stored in the private session cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Absolute expiry of `access_token`, milliseconds since the epoch.
    pub access_token_expires: i64,
    pub user: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl SessionRecord {
    /// Initial sign-in completion. The record is rebuilt from the fresh
    /// exchange, so any previous refresh token or error is dropped.
    #[must_use]
    pub fn from_sign_in(account: Account, user: UserProfile) -> Self {
        Self {
            access_token: account.access_token,
            refresh_token: account.refresh_token,
            id_token: account.id_token,
            access_token_expires: account.expires_at.saturating_mul(1000),
            user,
            error: None,
        }
    }

    #[must_use]
    pub fn token_state(&self, now_ms: i64) -> TokenState {
        if now_ms < self.access_token_expires {
            TokenState::Valid
        } else if self.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) {
            TokenState::NeedsRefresh
        } else {
            TokenState::Errored
        }
    }

    /// Fold a refresh result into the record.
    ///
    /// On failure every token is kept and the error flag is raised. On
    /// success the access token and expiry are replaced; refresh and id
    /// tokens only when the provider rotated them.
    #[must_use]
    pub fn apply_refresh(self, now_ms: i64, outcome: RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Failed => self.errored(),
            RefreshOutcome::Refreshed(response) => {
                let lifetime = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
                let lifetime_ms = i64::try_from(lifetime)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(1000);
                Self {
                    access_token: response.access_token,
                    access_token_expires: now_ms.saturating_add(lifetime_ms),
                    refresh_token: response
                        .refresh_token
                        .filter(|t| !t.is_empty())
                        .or(self.refresh_token),
                    id_token: response.id_token.or(self.id_token),
                    user: self.user,
                    error: None,
                }
            }
        }
    }

    /// Session read transition: `(record, now, refresh result)` to
    /// `(next record, next state)`.
    ///
    /// `outcome` is only consulted in the `NeedsRefresh` state. Passing
    /// `None` there returns the record untouched with `NeedsRefresh`, telling
    /// the caller a refresh call is due.
    #[must_use]
    pub fn read(self, now_ms: i64, outcome: Option<RefreshOutcome>) -> (Self, TokenState) {
        match self.token_state(now_ms) {
            TokenState::Valid => (self, TokenState::Valid),
            TokenState::Errored => (self.errored(), TokenState::Errored),
            TokenState::NeedsRefresh => match outcome {
                None => (self, TokenState::NeedsRefresh),
                Some(outcome) => {
                    let next = self.apply_refresh(now_ms, outcome);
                    let state = if next.error.is_some() {
                        TokenState::Errored
                    } else {
                        TokenState::Valid
                    };
                    (next, state)
                }
            },
        }
    }

    /// Browser-facing projection.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            user: self.user.clone(),
            access_token: self.access_token.clone(),
            error: self.error,
        }
    }

    fn errored(self) -> Self {
        Self {
            error: Some(SessionError::RefreshAccessTokenError),
            ..self
        }
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("user", &self.user.id)
            .field("access_token_expires", &self.access_token_expires)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// What the browser is allowed to see. The type has no refresh or id
/// token fields, so neither can be serialized to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: UserProfile,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

/// Current wall-clock time in milliseconds since the epoch.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
