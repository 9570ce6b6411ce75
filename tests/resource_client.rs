//! Protected resource calls and their user-facing error messages.

use oidc_session::{ResourceClient, ResourceError};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer, status: u16, body: &str) -> ResourceClient {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
    ResourceClient::new(format!("{}/me", server.uri()).parse().unwrap())
}

#[tokio::test]
async fn success_returns_json_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hello": "ada"})))
        .mount(&server)
        .await;

    let client = ResourceClient::new(format!("{}/me", server.uri()).parse().unwrap());
    let data = client.fetch("A1").await.unwrap();
    assert_eq!(data, json!({"hello": "ada"}));
}

#[tokio::test]
async fn unauthorized_mentions_expired_or_invalid() {
    let server = MockServer::start().await;
    let client = client_for(&server, 401, r#"{"error":"invalid_token"}"#).await;

    let err = client.fetch("A1").await.unwrap_err();
    assert!(matches!(err, ResourceError::Unauthorized { .. }));
    let message = err.to_string();
    assert!(message.contains("expired or invalid"), "{message}");
    assert!(message.contains("invalid_token"));
}

#[tokio::test]
async fn forbidden_mentions_insufficient_permissions() {
    let server = MockServer::start().await;
    let client = client_for(&server, 403, "scope api:read required").await;

    let err = client.fetch("A1").await.unwrap_err();
    assert!(err.to_string().contains("Insufficient permissions"));
    assert!(err.to_string().contains("scope api:read required"));
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn other_statuses_are_generic_http_errors() {
    let server = MockServer::start().await;
    let body = "x".repeat(1000);
    let client = client_for(&server, 503, &body).await;

    let err = client.fetch("A1").await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("HTTP error 503: "));
    assert!(message.len() < 300, "body should be truncated: {} bytes", message.len());
}
