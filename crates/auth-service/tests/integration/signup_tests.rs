//! E2E tests for user and maintainer signup.

use auth_test_utils::{
    TestAuthServer, TokenAssertions, ROLE_USER, TEST_MAINTAINER_EMAIL, TEST_PASSWORD,
    TEST_PHONE_NUMBER, TEST_USER_EMAIL,
};
use reqwest::StatusCode;
use serde_json::json;

fn signup_body(email: &str, password: &str) -> serde_json::Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "phoneNumber": TEST_PHONE_NUMBER,
        "password": password
    })
}

async fn post_signup(
    server: &TestAuthServer,
    kind: &str,
    body: &serde_json::Value,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(server
        .client()
        .post(format!("{}/api/auth/signup/{kind}", server.url()))
        .json(body)
        .send()
        .await?)
}

#[tokio::test]
async fn test_signup_user_returns_tokens_and_allows_login() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = post_signup(&server, "user", &signup_body(TEST_USER_EMAIL, TEST_PASSWORD)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    let access_token = body["accessToken"].as_str().unwrap_or_default().to_string();
    access_token.assert_valid_jwt().assert_has_role(ROLE_USER);

    server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    Ok(())
}

#[tokio::test]
async fn test_signup_duplicate_email_is_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = post_signup(
        &server,
        "user",
        &signup_body("Alice@Example.com", TEST_PASSWORD),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "EMAIL_IN_USE");

    Ok(())
}

#[tokio::test]
async fn test_signup_validation_errors_are_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let short_password = post_signup(&server, "user", &signup_body(TEST_USER_EMAIL, "short")).await?;
    assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);

    let bad_email = post_signup(&server, "user", &signup_body("not-an-email", TEST_PASSWORD)).await?;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

    let mut blank_name = signup_body(TEST_USER_EMAIL, TEST_PASSWORD);
    blank_name["firstName"] = json!("   ");
    let blank = post_signup(&server, "user", &blank_name).await?;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = blank.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    Ok(())
}

#[tokio::test]
async fn test_signup_maintainer_is_accepted_but_cannot_log_in() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = post_signup(
        &server,
        "maintainer",
        &signup_body(TEST_MAINTAINER_EMAIL, TEST_PASSWORD),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.text().await?.is_empty());

    let login = server
        .client()
        .post(format!("{}/api/auth/login", server.url()))
        .json(&json!({ "email": TEST_MAINTAINER_EMAIL, "password": TEST_PASSWORD }))
        .send()
        .await?;
    assert_eq!(login.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
