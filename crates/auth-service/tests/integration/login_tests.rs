//! E2E tests for password login.
//!
//! Unknown email, wrong password and inactive identity must be
//! indistinguishable to the caller.

use auth_test_utils::{
    signing_key_id, TestAuthServer, TokenAssertions, ROLE_MAINTAINER, ROLE_USER,
    TEST_MAINTAINER_EMAIL, TEST_PASSWORD, TEST_USER_EMAIL, TEST_WRONG_PASSWORD,
};
use common::types::Role;
use reqwest::StatusCode;
use serde_json::json;

async fn post_login(
    server: &TestAuthServer,
    email: &str,
    password: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(server
        .client()
        .post(format!("{}/api/auth/login", server.url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?)
}

#[tokio::test]
async fn test_login_happy_path_returns_token_pair() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let identity = server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = post_login(&server, TEST_USER_EMAIL, TEST_PASSWORD).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 900);
    assert!(body["refreshToken"].as_str().is_some_and(|s| !s.is_empty()));

    let access_token = body["accessToken"]
        .as_str()
        .expect("Should have accessToken")
        .to_string();
    access_token
        .assert_valid_jwt()
        .assert_has_role(ROLE_USER)
        .assert_for_subject(&identity.id.to_string())
        .assert_signed_by(&signing_key_id())
        .assert_expires_in(900);

    Ok(())
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = post_login(&server, "  ALICE@Example.com ", TEST_PASSWORD).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    server
        .create_identity(TEST_MAINTAINER_EMAIL, TEST_PASSWORD, Role::Maintainer, false)
        .await?;

    let wrong_password = post_login(&server, TEST_USER_EMAIL, TEST_WRONG_PASSWORD).await?;
    let unknown_email = post_login(&server, "nobody@example.com", TEST_PASSWORD).await?;
    let inactive = post_login(&server, TEST_MAINTAINER_EMAIL, TEST_PASSWORD).await?;

    let mut bodies = Vec::new();
    for response in [wrong_password, unknown_email, inactive] {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
        bodies.push(response.text().await?);
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
    assert!(bodies[0].contains("INVALID_CREDENTIALS"));

    Ok(())
}

#[tokio::test]
async fn test_login_active_maintainer_gets_maintainer_role() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .create_identity(TEST_MAINTAINER_EMAIL, TEST_PASSWORD, Role::Maintainer, true)
        .await?;

    let tokens = server.login(TEST_MAINTAINER_EMAIL, TEST_PASSWORD).await?;
    tokens.access_token.assert_has_role(ROLE_MAINTAINER);

    Ok(())
}

#[tokio::test]
async fn test_login_malformed_body_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/auth/login", server.url()))
        .json(&json!({ "email": TEST_USER_EMAIL }))
        .send()
        .await?;

    assert!(response.status().is_client_error());

    Ok(())
}
