//! E2E tests for `GET /api/users/me`, which trusts gateway-injected headers.

use auth_test_utils::{TestAuthServer, TEST_PASSWORD, TEST_USER_EMAIL};
use common::types::{USER_ID_HEADER, USER_ROLE_HEADER};
use reqwest::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn test_me_returns_profile_for_injected_identity() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let identity = server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = server
        .client()
        .get(format!("{}/api/users/me", server.url()))
        .header(USER_ID_HEADER, identity.id.to_string())
        .header(USER_ROLE_HEADER, "USER")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], identity.id.to_string());
    assert_eq!(body["email"], TEST_USER_EMAIL);
    assert_eq!(body["role"], "USER");
    assert!(body.get("passwordHash").is_none());

    Ok(())
}

#[tokio::test]
async fn test_me_without_identity_headers_is_401() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/api/users/me", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_me_for_unknown_identity_is_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/api/users/me", server.url()))
        .header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .header(USER_ROLE_HEADER, "ADMIN")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
