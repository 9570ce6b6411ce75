//! Mock identity provider and cookie plumbing shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use oidc_session::{AuthClient, ProviderConfig, ProviderEndpoints};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "demo-client";
pub const SESSION_SECRET: &str = "integration-test-session-secret-0123456789";

pub fn endpoints(server: &MockServer) -> ProviderEndpoints {
    ProviderEndpoints::new(
        format!("{}/authorize", server.uri()).parse().unwrap(),
        format!("{}/token", server.uri()).parse().unwrap(),
        format!("{}/userinfo", server.uri()).parse().unwrap(),
    )
}

pub fn provider(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new(server.uri().parse().unwrap(), CLIENT_ID)
}

pub fn auth_client(provider: ProviderConfig, server: &MockServer) -> AuthClient {
    AuthClient::new(
        provider,
        endpoints(server),
        "http://localhost:3000/api/auth/callback".parse().unwrap(),
    )
}

/// Token endpoint answering the `authorization_code` grant.
pub async fn mount_code_exchange(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Token endpoint answering the `refresh_token` grant, expected `times` times.
pub async fn mount_refresh(server: &MockServer, status: u16, body: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_userinfo(server: &MockServer, access_token: &str) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "u-1",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "picture": "https://cdn.example.com/ada.png",
            "tenant_id": "acme"
        })))
        .mount(server)
        .await;
}

/// Minimal browser cookie store: applies `Set-Cookie` headers and renders
/// the `Cookie` request header.
#[derive(Debug, Default, Clone)]
pub struct Browser {
    cookies: BTreeMap<String, String>,
}

impl Browser {
    pub fn absorb(&mut self, response: &Response<Body>) -> usize {
        let mut count = 0;
        for value in response.headers().get_all(SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
            count += 1;
        }
        count
    }

    pub fn has(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header_value);
        }
        builder.body(Body::empty()).unwrap()
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("redirect has a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
