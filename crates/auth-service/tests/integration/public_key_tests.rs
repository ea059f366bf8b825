//! E2E tests for public key distribution and operational endpoints.

use auth_test_utils::{
    signing_key_id, signing_public_key_base64, TestAuthServer, TEST_PASSWORD, TEST_USER_EMAIL,
};
use common::jwt::TokenVerifier;
use common::types::{PublicKeyResponse, Role};
use reqwest::StatusCode;

#[tokio::test]
async fn test_public_key_is_served_with_cache_headers() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/auth/public-key", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=3600")
    );

    let body: PublicKeyResponse = response.json().await?;
    assert_eq!(body.public_key, signing_public_key_base64());

    Ok(())
}

#[tokio::test]
async fn test_distributed_key_verifies_issued_tokens() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let identity = server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let body: PublicKeyResponse = reqwest::get(format!("{}/api/auth/public-key", server.url()))
        .await?
        .json()
        .await?;
    let verifier = TokenVerifier::from_base64_der(&body.public_key)?;
    assert_eq!(verifier.key_id(), signing_key_id());

    let claims = verifier.verify(&tokens.access_token)?;
    assert_eq!(claims.sub, identity.id.to_string());
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.email, TEST_USER_EMAIL);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
