use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::state::AuthState;
use crate::session::SessionRecord;

/// Session read for one request.
///
/// Decodes the record from the private session cookies, runs it through the
/// orchestrator at `now_ms`, and re-issues the cookie when the record
/// changed (refreshed or newly errored). The returned jar must be part of
/// the response for that write to reach the browser.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
///     let (jar, record) = resolve_session(&state, jar, now_millis()).await;
///     (jar, Json(record.map(|r| r.view()))).into_response()
/// }
/// ```
pub(super) async fn resolve_session(
    state: &AuthState,
    jar: PrivateCookieJar,
    now_ms: i64,
) -> (PrivateCookieJar, Option<SessionRecord>) {
    let Some(record) = cookies::get_session(&jar, &state.settings.session_cookie_name) else {
        return (jar, None);
    };

    let (next, token_state) = state.orchestrator.read(record.clone(), now_ms).await;
    if next == record {
        return (jar, Some(next));
    }

    tracing::debug!(user = %next.user.id, state = ?token_state, "Session record updated");

    match cookies::session_cookies(
        &state.settings.session_cookie_name,
        &next,
        state.settings.session_ttl_days,
        state.settings.secure_cookies,
    ) {
        Ok(chunks) => {
            let jar = cookies::replace_session(jar, &state.settings.session_cookie_name, chunks);
            (jar, Some(next))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode refreshed session");
            (jar, Some(next))
        }
    }
}
