use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use super::config::AuthConfig;
use super::cookies;
use super::error::AuthError;
use super::session::resolve_session;
use super::state::AuthState;
use crate::oauth::AuthClient;
use crate::orchestrator::SessionOrchestrator;
use crate::presentation::{self, ClientAction, ResourceClient};
use crate::provider::ProviderEndpoints;
use crate::session::{self, Account, SessionRecord};

/// Create the login flow router.
///
/// Mounts `login`, `callback`, `logout` and `session` under the configured
/// auth path, plus the demo pages `/` and `/api/resource`.
///
/// # Errors
///
/// Returns [`AuthError::Config`] if the provider configuration is invalid
/// or the redirect URI cannot be built.
pub fn router(config: AuthConfig, endpoints: ProviderEndpoints) -> Result<Router, AuthError> {
    config.provider.validate()?;
    let redirect_uri = config.redirect_uri()?;
    let auth_path = config.settings.auth_path.clone();
    let client = Arc::new(AuthClient::new(config.provider, endpoints, redirect_uri));

    let state = AuthState {
        orchestrator: SessionOrchestrator::new(client.clone()),
        client,
        resource: ResourceClient::new(config.api_url),
        settings: config.settings,
    };

    let router = Router::new()
        .route(&format!("{auth_path}/login"), get(login))
        .route(&format!("{auth_path}/callback"), get(callback))
        .route(&format!("{auth_path}/logout"), get(logout).post(logout))
        .route(&format!("{auth_path}/session"), get(session_view))
        .route("/", get(home))
        .route("/api/resource", get(resource));

    Ok(router.with_state(state))
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(State(state): State<AuthState>, jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    let auth_req = state.client.authorization_url();

    let (pkce_cookie, state_cookie) = cookies::pkce_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    let jar = jar.add(pkce_cookie).add(state_cookie);

    (jar, Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> (PrivateCookieJar, Redirect) {
    let settings = &state.settings;
    let outcome = complete_login(&state, &jar, params).await.and_then(|record| {
        cookies::session_cookies(
            &settings.session_cookie_name,
            &record,
            settings.session_ttl_days,
            settings.secure_cookies,
        )
        .map(|chunks| (record, chunks))
        .map_err(|e| {
            tracing::error!(error = %e, "Session encoding failed");
            "session_failed".to_string()
        })
    });

    let (clear_pkce, clear_state) = cookies::clear_pkce_cookies(&settings.auth_path);
    let jar = jar.add(clear_pkce).add(clear_state);

    match outcome {
        Ok((record, chunks)) => {
            tracing::info!(user = %record.user.id, "OIDC login successful");
            let jar = cookies::replace_session(jar, &settings.session_cookie_name, chunks);
            (jar, Redirect::to(&settings.login_redirect))
        }
        Err(code) => (jar, login_error(&settings.error_redirect, &code)),
    }
}

/// Validate the callback and mint the session record. Errors are the short
/// code appended to the error redirect.
async fn complete_login(
    state: &AuthState,
    jar: &PrivateCookieJar,
    params: CallbackParams,
) -> Result<SessionRecord, String> {
    if let Some(error) = params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
        return Err(error);
    }

    let code = params.code.ok_or("missing_code")?;
    let received_state = params.state.ok_or("state_mismatch")?;
    let stored_state = cookies::get_state(jar).ok_or("state_mismatch")?;

    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err("state_mismatch".into());
    }

    let code_verifier = cookies::get_pkce_verifier(jar).ok_or("missing_verifier")?;

    let exchanged_at = session::now_millis() / 1000;
    let token_response = state
        .client
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            "token_exchange_failed"
        })?;

    let user = state
        .client
        .fetch_profile(&token_response.access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Userinfo request failed");
            "userinfo_failed"
        })?;

    let account = Account::from_token_response(token_response, exchanged_at);
    Ok(state.orchestrator.sign_in(account, user))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(State(state): State<AuthState>, jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    if let Some(record) = cookies::get_session(&jar, &state.settings.session_cookie_name) {
        tracing::info!(user = %record.user.id, "Logout");
    }

    let jar = cookies::clear_session(jar, &state.settings.session_cookie_name);
    (jar, Redirect::to(&state.settings.logout_redirect))
}

// ── Session ────────────────────────────────────────────────────────

async fn session_view(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    let (jar, record) = resolve_session(&state, jar, session::now_millis()).await;
    (jar, Json(record.map(|r| r.view()))).into_response()
}

// ── Demo pages ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct HomeParams {
    error: Option<String>,
}

async fn home(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<HomeParams>,
) -> Response {
    let (jar, record) = resolve_session(&state, jar, session::now_millis()).await;
    let view = record.map(|r| r.view());

    let body = match presentation::react(view.as_ref()) {
        ClientAction::SignIn => {
            let login = format!("{}/login", state.settings.auth_path);
            return (jar, Redirect::to(&login)).into_response();
        }
        ClientAction::FetchAvailable { .. } => json!({
            "signedIn": true,
            "user": view.map(|v| v.user),
            "resource": "/api/resource",
            "signOut": format!("{}/logout", state.settings.auth_path),
        }),
        ClientAction::SignedOut => json!({
            "signedIn": false,
            "signIn": format!("{}/login", state.settings.auth_path),
            "error": params.error,
        }),
    };

    (jar, Json(body)).into_response()
}

async fn resource(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    let (jar, record) = resolve_session(&state, jar, session::now_millis()).await;
    let view = record.map(|r| r.view());

    let access_token = match presentation::react(view.as_ref()) {
        ClientAction::FetchAvailable { access_token } => access_token,
        ClientAction::SignIn => return (jar, AuthError::SessionExpired).into_response(),
        ClientAction::SignedOut => return (jar, AuthError::Unauthenticated).into_response(),
    };

    match state.resource.fetch(&access_token).await {
        Ok(data) => (jar, Json(json!({ "data": data }))).into_response(),
        Err(e) => {
            let status = e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            (status, jar, Json(json!({ "message": e.to_string() }))).into_response()
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(error_redirect: &str, code: &str) -> Redirect {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}"))
}
