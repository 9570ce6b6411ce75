use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::SessionRecord;

const PKCE_COOKIE_NAME: &str = "__oidc_pkce";
const STATE_COOKIE_NAME: &str = "__oidc_state";

/// Plaintext bytes per session cookie. Sealing adds a 12-byte nonce and a
/// 16-byte tag, then base64 grows it by 4/3: 2048 bytes become 2768, well
/// under the 4096-byte browser limit with name and attributes.
const SESSION_CHUNK_BYTES: usize = 2048;

/// Upper bound on session cookies: `name`, `name.1` .. `name.7`.
const MAX_SESSION_CHUNKS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub(super) enum SessionCookieError {
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("session record of {bytes} bytes does not fit in {max} cookies", max = MAX_SESSION_CHUNKS)]
    TooLarge { bytes: usize },
}

/// Create PKCE verifier + state cookies for the authorization request.
pub(super) fn pkce_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
    auth_path: &str,
) -> (Cookie<'static>, Cookie<'static>) {
    let build = |name: &'static str, value: &str| {
        Cookie::build((name, value.to_string()))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path(auth_path.to_string())
            .max_age(Duration::minutes(5))
            .build()
    };

    (build(PKCE_COOKIE_NAME, code_verifier), build(STATE_COOKIE_NAME, state))
}

/// Create removal cookies for PKCE verifier + state.
pub(super) fn clear_pkce_cookies(auth_path: &str) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    (verifier, state)
}

fn chunk_name(name: &str, index: usize) -> String {
    if index == 0 {
        name.to_string()
    } else {
        format!("{name}.{index}")
    }
}

/// Split on char boundaries into pieces of at most `max` bytes.
fn split_chunks(value: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = value;
    while rest.len() > max {
        let mut end = max;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

/// Session cookies carrying the whole record. The private jar encrypts
/// each one, so none of the tokens are readable by the browser.
///
/// Records too large for one cookie are split across `name`, `name.1`, ...
pub(super) fn session_cookies(
    name: &str,
    record: &SessionRecord,
    ttl_days: i64,
    secure: bool,
) -> Result<Vec<Cookie<'static>>, SessionCookieError> {
    let value = serde_json::to_string(record)?;
    let chunks = split_chunks(&value, SESSION_CHUNK_BYTES);
    if chunks.len() > MAX_SESSION_CHUNKS {
        return Err(SessionCookieError::TooLarge { bytes: value.len() });
    }
    if chunks.len() > 1 {
        tracing::debug!(bytes = value.len(), cookies = chunks.len(), "Session record split across cookies");
    }

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            Cookie::build((chunk_name(name, index), chunk.to_string()))
                .http_only(true)
                .secure(secure)
                .same_site(SameSite::Lax)
                .path("/".to_string())
                .max_age(Duration::days(ttl_days))
                .build()
        })
        .collect())
}

/// Write session cookies into the jar and drop leftover chunks from a
/// previously larger record.
pub(super) fn replace_session(
    jar: PrivateCookieJar,
    name: &str,
    cookies: Vec<Cookie<'static>>,
) -> PrivateCookieJar {
    let written = cookies.len();
    let jar = cookies.into_iter().fold(jar, |jar, cookie| jar.add(cookie));
    remove_chunks(jar, name, written)
}

/// Remove every session cookie present in the request.
pub(super) fn clear_session(jar: PrivateCookieJar, name: &str) -> PrivateCookieJar {
    let jar = jar.remove(removal(name.to_string()));
    remove_chunks(jar, name, 1)
}

fn remove_chunks(mut jar: PrivateCookieJar, name: &str, from: usize) -> PrivateCookieJar {
    for index in from.max(1)..MAX_SESSION_CHUNKS {
        let chunk = chunk_name(name, index);
        if jar.get(&chunk).is_none() {
            break;
        }
        jar = jar.remove(removal(chunk));
    }
    jar
}

fn removal(name: String) -> Cookie<'static> {
    Cookie::build((name, "")).path("/".to_string()).build()
}

/// Decode the session record, reassembling split cookies. Unreadable
/// payloads count as no session.
pub(super) fn get_session(jar: &PrivateCookieJar, name: &str) -> Option<SessionRecord> {
    let mut value = jar.get(name)?.value().to_string();
    for index in 1..MAX_SESSION_CHUNKS {
        match jar.get(&chunk_name(name, index)) {
            Some(chunk) => value.push_str(chunk.value()),
            None => break,
        }
    }

    match serde_json::from_str(&value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(error = %e, "Discarding undecodable session cookie");
            None
        }
    }
}

/// Get the PKCE verifier from cookies.
pub(super) fn get_pkce_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Get the state from cookies.
pub(super) fn get_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}
