use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only code challenge method this client sends.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// A PKCE verifier together with its derived S256 challenge.
///
/// The verifier stays server-side (private cookie); only the challenge
/// travels in the authorization redirect.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Fresh random verifier (64 URL-safe chars, RFC 7636 allows 43-128).
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 48] = rand::rng().random();
        Self::from_verifier(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// `challenge = BASE64URL(SHA256(verifier))`
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Random `state` value binding the redirect to the browser that started it.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
