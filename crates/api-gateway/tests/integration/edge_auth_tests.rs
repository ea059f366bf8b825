//! E2E tests for edge authentication in front of a real auth service.

use crate::gateway_harness::TestGateway;
use auth_test_utils::{
    TestAuthServer, TestTokenBuilder, TEST_MAINTAINER_EMAIL, TEST_PASSWORD, TEST_USER_EMAIL,
};
use common::types::Role;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Auth service, a jobs upstream, and a gateway routing to both.
async fn stack() -> Result<(TestAuthServer, MockServer, TestGateway), anyhow::Error> {
    let auth = TestAuthServer::spawn().await?;
    let upstream = MockServer::start().await;
    let routes = format!(
        "/api/auth={auth_url},/api/users={auth_url},/api/jobs={jobs_url}",
        auth_url = auth.url(),
        jobs_url = upstream.uri()
    );
    let gateway =
        TestGateway::spawn(&format!("{}/api/auth/public-key", auth.url()), &routes).await?;
    Ok((auth, upstream, gateway))
}

#[tokio::test]
async fn test_maintainer_session_through_gateway() -> Result<(), anyhow::Error> {
    let (auth, upstream, gateway) = stack().await?;
    let maintainer = auth
        .create_identity(TEST_MAINTAINER_EMAIL, TEST_PASSWORD, Role::Maintainer, true)
        .await?;

    Mock::given(method("GET"))
        .and(path("/api/jobs/42"))
        .and(header("x-user-id", maintainer.id.to_string().as_str()))
        .and(header("x-user-role", "MAINTAINER"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&upstream)
        .await;

    // Login is public
    let login = gateway
        .client()
        .post(format!("{}/api/auth/login", gateway.url()))
        .json(&json!({ "email": TEST_MAINTAINER_EMAIL, "password": TEST_PASSWORD }))
        .send()
        .await?;
    assert_eq!(login.status(), StatusCode::OK);
    let tokens: serde_json::Value = login.json().await?;
    let access = tokens["accessToken"].as_str().unwrap_or_default().to_string();
    let first_refresh = tokens["refreshToken"].as_str().unwrap_or_default().to_string();

    let job = gateway
        .client()
        .get(format!("{}/api/jobs/42", gateway.url()))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(job.status(), StatusCode::OK);
    let body: serde_json::Value = job.json().await?;
    assert_eq!(body["id"], 42);

    let refreshed = gateway
        .client()
        .post(format!("{}/api/auth/refresh", gateway.url()))
        .json(&json!({ "refreshToken": first_refresh }))
        .send()
        .await?;
    assert_eq!(refreshed.status(), StatusCode::OK);
    let rotated: serde_json::Value = refreshed.json().await?;
    assert_ne!(rotated["refreshToken"].as_str(), Some(first_refresh.as_str()));

    let replay = gateway
        .client()
        .post(format!("{}/api/auth/refresh", gateway.url()))
        .json(&json!({ "refreshToken": first_refresh }))
        .send()
        .await?;
    assert_eq!(replay.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn test_profile_through_gateway() -> Result<(), anyhow::Error> {
    let (auth, _upstream, gateway) = stack().await?;
    let alice = auth.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = auth.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = gateway
        .client()
        .get(format!("{}/api/users/me", gateway.url()))
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let profile: serde_json::Value = response.json().await?;
    assert_eq!(profile["id"], alice.id.to_string());
    assert_eq!(profile["email"], TEST_USER_EMAIL);
    assert_eq!(profile["role"], "USER");
    assert!(profile.get("passwordHash").is_none());

    Ok(())
}

#[tokio::test]
async fn test_forged_identity_headers_never_reach_upstream() -> Result<(), anyhow::Error> {
    let (auth, upstream, gateway) = stack().await?;
    let alice = auth.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = auth.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .and(header("x-user-id", alice.id.to_string().as_str()))
        .and(header("x-user-role", "USER"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let response = gateway
        .client()
        .get(format!("{}/api/jobs", gateway.url()))
        .bearer_auth(&tokens.access_token)
        .header("X-User-ID", "00000000-0000-0000-0000-000000000001")
        .header("X-User-Role", "ADMIN")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_protected_route_without_token_is_401() -> Result<(), anyhow::Error> {
    let (_auth, upstream, gateway) = stack().await?;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let response = gateway
        .client()
        .get(format!("{}/api/jobs", gateway.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected_at_the_edge() -> Result<(), anyhow::Error> {
    let (_auth, upstream, gateway) = stack().await?;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let tokens = [
        TestTokenBuilder::new().sign_with_foreign_key(),
        TestTokenBuilder::new().expires_in(-60).sign(),
        TestTokenBuilder::new().without_role().sign(),
        "not-a-jwt".to_string(),
    ];

    let mut bodies = Vec::new();
    for token in &tokens {
        let response = gateway
            .client()
            .get(format!("{}/api/jobs", gateway.url()))
            .bearer_auth(token)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(response.text().await?);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

    Ok(())
}

#[tokio::test]
async fn test_locally_signed_token_is_accepted() -> Result<(), anyhow::Error> {
    let (_auth, upstream, gateway) = stack().await?;
    let user_id = uuid::Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/api/jobs/7"))
        .and(header("x-user-id", user_id.to_string().as_str()))
        .and(header("x-user-role", "ADMIN"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&upstream)
        .await;

    let token = TestTokenBuilder::new()
        .for_user(user_id)
        .with_role("ADMIN")
        .sign();
    let response = gateway
        .client()
        .delete(format!("{}/api/jobs/7", gateway.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_connection_header_cannot_drop_injected_identity() -> Result<(), anyhow::Error> {
    let (auth, upstream, gateway) = stack().await?;
    let maintainer = auth
        .create_identity(TEST_MAINTAINER_EMAIL, TEST_PASSWORD, Role::Maintainer, true)
        .await?;
    let tokens = auth.login(TEST_MAINTAINER_EMAIL, TEST_PASSWORD).await?;

    Mock::given(method("GET"))
        .and(path("/api/jobs/42"))
        .and(header("x-user-id", maintainer.id.to_string().as_str()))
        .and(header("x-user-role", "MAINTAINER"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let response = gateway
        .client()
        .get(format!("{}/api/jobs/42", gateway.url()))
        .bearer_auth(&tokens.access_token)
        .header("Connection", "keep-alive, x-user-id, x-user-role")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
