//! E2E tests for the boot-time public key fetch and fail-closed behavior.

use crate::gateway_harness::{closed_port_url, TestGateway};
use auth_test_utils::{TestAuthServer, TestTokenBuilder, TEST_PASSWORD, TEST_USER_EMAIL};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn broken_key_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_key_fetch_failure_fails_closed() -> Result<(), anyhow::Error> {
    let auth = TestAuthServer::spawn().await?;
    let keys = broken_key_server().await;
    let routes = format!("/api/auth={url},/api/users={url}", url = auth.url());
    let gateway = TestGateway::spawn(&keys.uri(), &routes).await?;
    let tokens_from_auth = {
        auth.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
        auth.login(TEST_USER_EMAIL, TEST_PASSWORD).await?
    };

    // A perfectly valid token is still refused
    let response = gateway
        .client()
        .get(format!("{}/api/users/me", gateway.url()))
        .bearer_auth(&tokens_from_auth.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    // Public paths keep working
    let login = gateway
        .client()
        .post(format!("{}/api/auth/login", gateway.url()))
        .json(&json!({ "email": TEST_USER_EMAIL, "password": TEST_PASSWORD }))
        .send()
        .await?;
    assert_eq!(login.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_key_endpoint_fails_closed() -> Result<(), anyhow::Error> {
    let gateway = TestGateway::spawn(
        &format!("{}/api/auth/public-key", closed_port_url().await?),
        "/api/jobs=http://127.0.0.1:9",
    )
    .await?;

    let response = gateway
        .client()
        .get(format!("{}/api/jobs", gateway.url()))
        .bearer_auth(TestTokenBuilder::new().sign())
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn test_health_reports_key_state() -> Result<(), anyhow::Error> {
    let auth = TestAuthServer::spawn().await?;
    let healthy = TestGateway::spawn(
        &format!("{}/api/auth/public-key", auth.url()),
        &format!("/api/auth={}", auth.url()),
    )
    .await?;

    let keys = broken_key_server().await;
    let degraded = TestGateway::spawn(&keys.uri(), &format!("/api/auth={}", auth.url())).await?;

    let body: serde_json::Value = healthy
        .client()
        .get(format!("{}/health", healthy.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["publicKeyLoaded"], true);

    let response = degraded
        .client()
        .get(format!("{}/health", degraded.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["publicKeyLoaded"], false);

    Ok(())
}

#[tokio::test]
async fn test_gateway_metrics_endpoint_is_unauthenticated() -> Result<(), anyhow::Error> {
    let keys = broken_key_server().await;
    let gateway = TestGateway::spawn(&keys.uri(), "/api/jobs=http://127.0.0.1:9").await?;

    let response = gateway
        .client()
        .get(format!("{}/metrics", gateway.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
