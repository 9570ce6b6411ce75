use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Stable subject identifier issued by the IdP (OIDC `sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Subject(pub String);

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Raw claims returned by the userinfo endpoint.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Internal user shape produced by the provider's profile mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Tenant / provider identifier taken from a configurable custom claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: impl Into<Subject>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            image: None,
            tenant: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// Token endpoint response, shared by the code exchange and the refresh grant.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".into()),
            expires_in: None,
            refresh_token: None,
            id_token: None,
        }
    }

    #[must_use]
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_from_str() {
        let id = Subject::from("user-123");
        assert_eq!(id.to_string(), "user-123");
    }

    #[test]
    fn profile_omits_absent_fields() {
        let profile = UserProfile::new("abc").with_email("a@example.com");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["email"], "a@example.com");
        assert!(json.get("name").is_none());
        assert!(json.get("tenant").is_none());
    }

    #[test]
    fn token_response_optional_fields_default() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":"A2"}"#).unwrap();
        assert_eq!(parsed.access_token, "A2");
        assert!(parsed.expires_in.is_none());
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.id_token.is_none());
    }
}
