//! E2E tests for refresh token rotation and logout.

use auth_test_utils::{TestAuthServer, TEST_PASSWORD, TEST_USER_EMAIL};
use chrono::{Duration, Utc};
use common::secret::SecretString;
use reqwest::StatusCode;
use serde_json::json;

async fn post_refresh(
    server: &TestAuthServer,
    refresh_token: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(server
        .client()
        .post(format!("{}/api/auth/refresh", server.url()))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await?)
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let first = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let response = post_refresh(&server, &first.refresh_token).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let second: serde_json::Value = response.json().await?;
    let second_refresh = second["refreshToken"].as_str().unwrap_or_default();
    assert!(!second_refresh.is_empty());
    assert_ne!(second_refresh, first.refresh_token);

    // The consumed secret is gone for good
    let replay = post_refresh(&server, &first.refresh_token).await?;
    assert_eq!(replay.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = replay.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");

    // The rotated one still works
    let next = post_refresh(&server, second_refresh).await?;
    assert_eq!(next.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_new_login_invalidates_previous_refresh_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let identity = server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let first = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let second = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    assert_eq!(
        server
            .issuer()
            .refresh_tokens()
            .count_for_identity(identity.id)
            .await?,
        1
    );
    assert_eq!(
        post_refresh(&server, &first.refresh_token).await?.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        post_refresh(&server, &second.refresh_token).await?.status(),
        StatusCode::OK
    );

    Ok(())
}

#[tokio::test]
async fn test_unknown_and_expired_refresh_tokens_look_the_same() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let identity = server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    server
        .issuer()
        .refresh_tokens()
        .replace_for_identity(
            identity.id,
            &SecretString::from("expired-secret"),
            Utc::now() - Duration::seconds(1),
        )
        .await?;

    let expired = post_refresh(&server, "expired-secret").await?;
    let unknown = post_refresh(&server, "never-issued").await?;

    assert_eq!(expired.status(), StatusCode::FORBIDDEN);
    assert_eq!(unknown.status(), StatusCode::FORBIDDEN);
    assert_eq!(expired.text().await?, unknown.text().await?);

    // The expired row was consumed by the attempt
    assert_eq!(
        server
            .issuer()
            .refresh_tokens()
            .count_for_identity(identity.id)
            .await?,
        0
    );

    Ok(())
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let logout = server
        .client()
        .post(format!("{}/api/auth/logout", server.url()))
        .json(&json!({ "refreshToken": tokens.refresh_token }))
        .send()
        .await?;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        post_refresh(&server, &tokens.refresh_token).await?.status(),
        StatusCode::FORBIDDEN
    );

    // Idempotent
    let again = server
        .client()
        .post(format!("{}/api/auth/logout", server.url()))
        .json(&json!({ "refreshToken": tokens.refresh_token }))
        .send()
        .await?;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let (a, b) = tokio::join!(
        post_refresh(&server, &tokens.refresh_token),
        post_refresh(&server, &tokens.refresh_token)
    );
    let mut statuses = [a?.status().as_u16(), b?.status().as_u16()];
    statuses.sort_unstable();

    assert_eq!(statuses, [200, 403]);

    Ok(())
}
