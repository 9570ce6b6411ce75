use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::provider::ProviderConfig;

/// Fallback cookie key material for local development only.
pub(crate) const DEV_SESSION_SECRET: &str = "oidc-session-development-secret-do-not-use-in-production";

const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__oidc_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
            auth_path: "/api/auth".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/".into(),
        }
    }
}

/// Login flow configuration.
///
/// Required fields (`provider`, `app_url`) are constructor parameters.
/// Use [`from_env()`](AuthConfig::from_env) for convention-based setup,
/// or [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(super) provider: ProviderConfig,
    pub(super) app_url: Url,
    pub(super) api_url: Url,
    pub(super) settings: AuthSettings,
}

impl AuthConfig {
    /// Create config with an ephemeral cookie key.
    ///
    /// Cookies are `Secure` when `app_url` is https. The protected API
    /// defaults to `http://localhost:8000`.
    #[must_use]
    pub fn new(provider: ProviderConfig, app_url: Url) -> Self {
        let mut settings = AuthSettings::defaults();
        settings.secure_cookies = app_url.scheme() == "https";
        Self {
            provider,
            app_url,
            api_url: "http://localhost:8000".parse().expect("valid default URL"),
            settings,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OIDC_ISSUER`: IdP issuer base URL
    /// - `OIDC_CLIENT_ID`: OAuth2 client ID
    ///
    /// # Optional env vars
    /// - `OIDC_CLIENT_SECRET`: only for confidential clients; empty means public
    /// - `OIDC_DISCOVERY_URL`: override `<issuer>/.well-known/openid-configuration`
    /// - `OIDC_SCOPES`: extra scopes (space or comma separated)
    /// - `OIDC_TENANT_CLAIM`: claim mapped to the user's tenant
    /// - `SESSION_SECRET`: cookie key material, at least 32 bytes
    /// - `APP_URL`: canonical application URL (default `http://localhost:3000`)
    /// - `API_ORIGIN`: protected resource URL (default `http://localhost:8000`)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing, URLs
    /// are invalid, or the provider fails validation.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// As [`from_env`](Self::from_env), reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let issuer = parse_url(
            "OIDC_ISSUER",
            &var("OIDC_ISSUER").ok_or_else(|| AuthError::Config("OIDC_ISSUER is required".into()))?,
        )?;
        let client_id = var("OIDC_CLIENT_ID")
            .ok_or_else(|| AuthError::Config("OIDC_CLIENT_ID is required".into()))?;

        let mut provider = ProviderConfig::new(issuer, client_id);
        if let Some(secret) = var("OIDC_CLIENT_SECRET") {
            provider = provider.with_client_secret(secret);
        }
        if let Some(url) = var("OIDC_DISCOVERY_URL") {
            provider = provider.with_discovery_url(parse_url("OIDC_DISCOVERY_URL", &url)?);
        }
        if let Some(scopes) = var("OIDC_SCOPES") {
            provider = provider.with_extra_scopes(
                scopes
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(claim) = var("OIDC_TENANT_CLAIM") {
            provider = provider.with_tenant_claim(claim);
        }
        provider.validate()?;

        let app_url = match var("APP_URL") {
            Some(url) => parse_url("APP_URL", &url)?,
            None => "http://localhost:3000".parse().expect("valid default URL"),
        };

        let mut config = Self::new(provider, app_url);

        if let Some(url) = var("API_ORIGIN") {
            config = config.with_api_url(parse_url("API_ORIGIN", &url)?);
        }

        let secret = match var("SESSION_SECRET") {
            Some(secret) => secret,
            None if config.settings.secure_cookies => {
                return Err(AuthError::Config(
                    "SESSION_SECRET is required when APP_URL is https".into(),
                ));
            }
            None => {
                tracing::warn!(
                    "SESSION_SECRET is not set; using the development fallback key. \
                     Never run like this in production."
                );
                DEV_SESSION_SECRET.to_string()
            }
        };
        if secret == DEV_SESSION_SECRET && config.settings.secure_cookies {
            return Err(AuthError::Config(
                "the development session secret cannot be used with an https APP_URL".into(),
            ));
        }

        config.with_session_secret(&secret)
    }

    /// Derive the cookie key from a secret of at least 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the secret is too short.
    pub fn with_session_secret(mut self, secret: &str) -> Result<Self, AuthError> {
        if secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AuthError::Config(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_BYTES} bytes"
            )));
        }
        self.settings.cookie_key = Key::derive_from(secret.as_bytes());
        Ok(self)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    #[must_use]
    pub fn app_url(&self) -> &Url {
        &self.app_url
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// `APP_URL` + auth path + `/callback`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the combination is not a valid URL.
    pub fn redirect_uri(&self) -> Result<Url, AuthError> {
        let uri = format!(
            "{}{}/callback",
            self.app_url.as_str().trim_end_matches('/'),
            self.settings.auth_path
        );
        parse_url("redirect URI", &uri)
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, AuthError> {
    value
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}
