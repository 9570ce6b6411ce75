use url::Url;

use crate::error::Error;
use crate::orchestrator::TokenRefresher;
use crate::pkce::{self, CODE_CHALLENGE_METHOD, PkcePair};
use crate::provider::{ProviderConfig, ProviderEndpoints};
use crate::types::{Claims, TokenResponse, UserProfile};

/// OIDC client for one provider: authorization redirects, code exchange,
/// refresh grants and userinfo lookups.
pub struct AuthClient {
    provider: ProviderConfig,
    endpoints: ProviderEndpoints,
    redirect_uri: Url,
    http: reqwest::Client,
}

/// Authorization URL with the PKCE parameters to keep server-side.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

impl AuthClient {
    #[must_use]
    pub fn new(provider: ProviderConfig, endpoints: ProviderEndpoints, redirect_uri: Url) -> Self {
        Self {
            provider,
            endpoints,
            redirect_uri,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Generate an authorization URL with PKCE parameters.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = pkce::generate_state();
        let pkce = PkcePair::generate();
        let scope = self.provider.scopes.join(" ");

        let mut url = self.endpoints.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.provider.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", &state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);

        AuthorizationRequest {
            url: url.into(),
            state,
            code_verifier: pkce.verifier,
        }
    }

    /// Exchange an authorization code for tokens using PKCE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint returns an error.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.provider.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];
        self.token_request(params, "token exchange").await
    }

    /// Obtain a new access token with the `refresh_token` grant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint rejects the refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.provider.client_id.as_str()),
        ];
        self.token_request(params, "token refresh").await
    }

    /// Fetch the raw userinfo claims using an access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the userinfo endpoint returns an error.
    pub async fn fetch_user_claims(&self, access_token: &str) -> Result<Claims, Error> {
        let response = self
            .http
            .get(self.endpoints.userinfo_endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        response.json::<Claims>().await.map_err(Into::into)
    }

    /// Fetch userinfo and run it through the provider's profile mapper.
    ///
    /// # Errors
    ///
    /// As [`fetch_user_claims`](Self::fetch_user_claims), plus
    /// [`Error::OAuth`] when the claims carry no usable `sub`.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, Error> {
        let claims = self.fetch_user_claims(access_token).await?;
        self.provider.map_profile(&claims).ok_or_else(|| Error::OAuth {
            operation: "profile mapping",
            status: None,
            detail: "userinfo response has no subject".into(),
        })
    }

    /// POSTs a form to the token endpoint. The client secret is appended
    /// only for confidential clients; public clients never send the field.
    async fn token_request<'a>(
        &'a self,
        mut params: Vec<(&'a str, &'a str)>,
        operation: &'static str,
    ) -> Result<TokenResponse, Error> {
        if let Some(secret) = self.provider.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(self.endpoints.token_endpoint.clone())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, operation).await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

impl TokenRefresher for AuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        self.refresh_access_token(refresh_token).await
    }
}
