//! Declarative description of the external Identity Provider.
//!
//! A [`ProviderConfig`] is built once at startup, validated, and never
//! mutated afterwards. Runtime endpoints come from the OIDC discovery
//! document ([`ProviderEndpoints`]).

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::Error;
use crate::types::{Claims, UserProfile};

/// Custom profile mapping hook. Returns `None` when the claims cannot
/// identify a user (no `sub`).
pub type ProfileMapper = Arc<dyn Fn(&Claims) -> Option<UserProfile> + Send + Sync>;

const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];
const DEFAULT_TENANT_CLAIM: &str = "tenant_id";

/// Static configuration of one OIDC provider.
///
/// Required fields are constructor parameters; everything else has a
/// default and a `with_*` override.
///
/// ```rust,ignore
/// let provider = ProviderConfig::new("https://idp.example.com".parse()?, "demo-client")
///     .with_extra_scopes(["offline_access"])
///     .with_tenant_claim("org_id");
/// provider.validate()?;
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) issuer: Url,
    pub(crate) discovery_url: Option<Url>,
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) scopes: Vec<String>,
    pub(crate) tenant_claim: String,
    pub(crate) profile_mapper: Option<ProfileMapper>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(issuer: Url, client_id: impl Into<String>) -> Self {
        Self {
            issuer,
            discovery_url: None,
            client_id: client_id.into(),
            client_secret: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            tenant_claim: DEFAULT_TENANT_CLAIM.into(),
            profile_mapper: None,
        }
    }

    /// Override the discovery document location.
    #[must_use]
    pub fn with_discovery_url(mut self, url: Url) -> Self {
        self.discovery_url = Some(url);
        self
    }

    /// Attach a client secret. An empty string leaves the client public.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.client_secret = (!secret.is_empty()).then_some(secret);
        self
    }

    /// Replace the requested scopes entirely.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Append scopes to the defaults, skipping duplicates and blanks.
    #[must_use]
    pub fn with_extra_scopes<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for scope in extra {
            let scope = scope.into();
            if !scope.is_empty() && !self.scopes.contains(&scope) {
                self.scopes.push(scope);
            }
        }
        self
    }

    /// Claim mapped to [`UserProfile::tenant`] by the default mapper.
    #[must_use]
    pub fn with_tenant_claim(mut self, claim: impl Into<String>) -> Self {
        self.tenant_claim = claim.into();
        self
    }

    /// Replace the default claim-to-profile mapping.
    #[must_use]
    pub fn with_profile_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Claims) -> Option<UserProfile> + Send + Sync + 'static,
    {
        self.profile_mapper = Some(Arc::new(mapper));
        self
    }

    /// Startup validation. Misconfiguration is not recoverable at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client id is blank, the issuer is
    /// not an http(s) URL, or the scopes do not include `openid`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client id must not be empty".into()));
        }
        if !matches!(self.issuer.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "issuer must be an http(s) URL, got {}",
                self.issuer
            )));
        }
        if !self.scopes.iter().any(|s| s == "openid") {
            return Err(Error::Config("scopes must include \"openid\"".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn tenant_claim(&self) -> &str {
        &self.tenant_claim
    }

    /// Explicit discovery URL, or `<issuer>/.well-known/openid-configuration`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the derived URL does not parse.
    pub fn discovery_url(&self) -> Result<Url, Error> {
        if let Some(url) = &self.discovery_url {
            return Ok(url.clone());
        }
        let derived = format!(
            "{}/.well-known/openid-configuration",
            self.issuer.as_str().trim_end_matches('/')
        );
        derived
            .parse()
            .map_err(|e| Error::Config(format!("discovery URL: {e}")))
    }

    /// Translate IdP claims into the internal user shape.
    #[must_use]
    pub fn map_profile(&self, claims: &Claims) -> Option<UserProfile> {
        match &self.profile_mapper {
            Some(mapper) => mapper(claims),
            None => map_standard_claims(claims, &self.tenant_claim),
        }
    }

    /// Fetch and parse the provider's discovery document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure and [`Error::Discovery`]
    /// on a non-2xx status or a document missing required endpoints.
    #[cfg(feature = "oauth")]
    pub async fn discover(&self, http: &reqwest::Client) -> Result<ProviderEndpoints, Error> {
        let url = self.discovery_url()?;
        let response = http.get(url.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Discovery(format!("{url} returned HTTP {status}: {body}")));
        }

        let endpoints = response
            .json::<ProviderEndpoints>()
            .await
            .map_err(|e| Error::Discovery(format!("invalid discovery document: {e}")))?;

        tracing::info!(
            issuer = %self.issuer,
            authorization_endpoint = %endpoints.authorization_endpoint,
            token_endpoint = %endpoints.token_endpoint,
            "OIDC discovery complete"
        );

        Ok(endpoints)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("issuer", &self.issuer.as_str())
            .field("discovery_url", &self.discovery_url.as_ref().map(Url::as_str))
            .field("client_id", &self.client_id)
            .field("client_secret_set", &self.client_secret.is_some())
            .field("scopes", &self.scopes)
            .field("tenant_claim", &self.tenant_claim)
            .field("custom_profile_mapper", &self.profile_mapper.is_some())
            .finish()
    }
}

/// Endpoints from `.well-known/openid-configuration`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ProviderEndpoints {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub userinfo_endpoint: Url,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<Url>,
}

impl ProviderEndpoints {
    /// Endpoints supplied directly instead of discovered.
    #[must_use]
    pub fn new(authorization_endpoint: Url, token_endpoint: Url, userinfo_endpoint: Url) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            userinfo_endpoint,
            issuer: None,
            end_session_endpoint: None,
        }
    }
}

/// Default mapping: `sub`, `name` (or `preferred_username`), `email`,
/// `picture` and one custom tenant claim.
#[must_use]
pub fn map_standard_claims(claims: &Claims, tenant_claim: &str) -> Option<UserProfile> {
    let sub = claim_string(claims, "sub").filter(|s| !s.is_empty())?;
    Some(UserProfile {
        id: sub.into(),
        name: claim_string(claims, "name").or_else(|| claim_string(claims, "preferred_username")),
        email: claim_string(claims, "email"),
        image: claim_string(claims, "picture"),
        tenant: claim_string(claims, tenant_claim),
    })
}

fn claim_string(claims: &Claims, key: &str) -> Option<String> {
    match claims.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn issuer() -> Url {
        "https://idp.example.com/realms/demo".parse().unwrap()
    }

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims fixture must be an object"),
        }
    }

    #[test]
    fn discovery_url_defaults_under_issuer_path() {
        let config = ProviderConfig::new(issuer(), "demo");
        assert_eq!(
            config.discovery_url().unwrap().as_str(),
            "https://idp.example.com/realms/demo/.well-known/openid-configuration"
        );
    }

    #[test]
    fn discovery_url_ignores_trailing_slash() {
        let config = ProviderConfig::new("https://idp.example.com/".parse().unwrap(), "demo");
        assert_eq!(
            config.discovery_url().unwrap().as_str(),
            "https://idp.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn explicit_discovery_url_wins() {
        let config = ProviderConfig::new(issuer(), "demo")
            .with_discovery_url("https://other.example.com/oidc.json".parse().unwrap());
        assert_eq!(
            config.discovery_url().unwrap().as_str(),
            "https://other.example.com/oidc.json"
        );
    }

    #[test]
    fn default_scopes_include_openid_profile_email() {
        let config = ProviderConfig::new(issuer(), "demo");
        assert_eq!(config.scopes(), &["openid", "profile", "email"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn extra_scopes_append_without_duplicates() {
        let config = ProviderConfig::new(issuer(), "demo")
            .with_extra_scopes(["offline_access", "email", ""]);
        assert_eq!(config.scopes(), &["openid", "profile", "email", "offline_access"]);
    }

    #[test]
    fn validate_rejects_missing_openid_scope() {
        let config = ProviderConfig::new(issuer(), "demo").with_scopes(vec!["profile".into()]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_blank_client_id() {
        let config = ProviderConfig::new(issuer(), "  ");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_non_http_issuer() {
        let config = ProviderConfig::new("ftp://idp.example.com".parse().unwrap(), "demo");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_client_secret_is_not_stored() {
        let public = ProviderConfig::new(issuer(), "demo").with_client_secret("");
        assert!(public.client_secret().is_none());

        let confidential = ProviderConfig::new(issuer(), "demo").with_client_secret("s3cret");
        assert_eq!(confidential.client_secret(), Some("s3cret"));
    }

    #[test]
    fn debug_hides_client_secret() {
        let config = ProviderConfig::new(issuer(), "demo").with_client_secret("s3cret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("client_secret_set: true"));
    }

    #[test]
    fn standard_mapping_reads_all_claims() {
        let config = ProviderConfig::new(issuer(), "demo").with_tenant_claim("org");
        let profile = config
            .map_profile(&claims(json!({
                "sub": "u-1",
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "picture": "https://cdn.example.com/ada.png",
                "org": 42
            })))
            .unwrap();

        assert_eq!(profile.id.to_string(), "u-1");
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.image.as_deref(), Some("https://cdn.example.com/ada.png"));
        assert_eq!(profile.tenant.as_deref(), Some("42"));
    }

    #[test]
    fn name_falls_back_to_preferred_username() {
        let profile =
            map_standard_claims(&claims(json!({"sub": "u-1", "preferred_username": "ada"})), "tenant_id")
                .unwrap();
        assert_eq!(profile.name.as_deref(), Some("ada"));
        assert!(profile.tenant.is_none());
    }

    #[test]
    fn mapping_without_sub_fails() {
        assert!(map_standard_claims(&claims(json!({"email": "x@example.com"})), "tenant_id").is_none());
        assert!(map_standard_claims(&claims(json!({"sub": ""})), "tenant_id").is_none());
    }

    #[test]
    fn custom_mapper_replaces_default() {
        let config = ProviderConfig::new(issuer(), "demo").with_profile_mapper(|c| {
            let oid = c.get("oid")?.as_str()?;
            Some(UserProfile::new(oid).with_tenant("fixed"))
        });
        let profile = config
            .map_profile(&claims(json!({"sub": "ignored", "oid": "object-1"})))
            .unwrap();
        assert_eq!(profile.id.to_string(), "object-1");
        assert_eq!(profile.tenant.as_deref(), Some("fixed"));
    }

    #[test]
    fn endpoints_parse_from_discovery_document() {
        let doc = json!({
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/authorize",
            "token_endpoint": "https://idp.example.com/token",
            "userinfo_endpoint": "https://idp.example.com/userinfo",
            "jwks_uri": "https://idp.example.com/jwks"
        });
        let endpoints: ProviderEndpoints = serde_json::from_value(doc).unwrap();
        assert_eq!(endpoints.token_endpoint.as_str(), "https://idp.example.com/token");
        assert!(endpoints.end_session_endpoint.is_none());
    }
}
