//! PostgreSQL-backed store tests.
//!
//! Ignored by default; run with a database:
//! `DATABASE_URL=postgres://... cargo test -p auth-service -- --ignored`

use auth_service::errors::AuthError;
use auth_service::models::NewIdentity;
use auth_service::repositories::{
    IdentityStore, PgIdentityStore, PgRefreshTokenStore, RefreshTokenStore,
};
use auth_test_utils::{TestAuthServer, TEST_PASSWORD, TEST_USER_EMAIL};
use chrono::{Duration, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

fn new_identity(email: &str) -> NewIdentity {
    NewIdentity {
        email: email.to_string(),
        phone_number: "+15550100".to_string(),
        first_name: "Pg".to_string(),
        last_name: "Test".to_string(),
        password_hash: "$2b$10$placeholder".to_string(),
        role: Role::User,
        is_active: true,
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_pg_identity_duplicate_email(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgIdentityStore::new(pool);
    let created = store.create(new_identity("pg@example.com")).await?;

    let found = store.find_by_email("pg@example.com").await?;
    assert_eq!(found.map(|i| i.id), Some(created.id));

    let duplicate = store.create(new_identity("pg@example.com")).await;
    assert!(matches!(duplicate, Err(AuthError::EmailInUse)));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_pg_refresh_replace_and_take(pool: PgPool) -> Result<(), anyhow::Error> {
    let identities = PgIdentityStore::new(pool.clone());
    let tokens = PgRefreshTokenStore::new(pool);
    let identity = identities.create(new_identity("rt@example.com")).await?;
    let expires = Utc::now() + Duration::days(7);

    tokens
        .replace_for_identity(identity.id, &SecretString::from("first"), expires)
        .await?;
    tokens
        .replace_for_identity(identity.id, &SecretString::from("second"), expires)
        .await?;
    assert_eq!(tokens.count_for_identity(identity.id).await?, 1);

    assert!(tokens.take("first").await?.is_none());
    let taken = tokens.take("second").await?.expect("second should be live");
    assert_eq!(taken.secret.expose_secret(), "second");
    assert!(tokens.take("second").await?.is_none());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_pg_concurrent_take_has_one_winner(pool: PgPool) -> Result<(), anyhow::Error> {
    let identities = PgIdentityStore::new(pool.clone());
    let tokens = Arc::new(PgRefreshTokenStore::new(pool));
    let identity = identities.create(new_identity("race@example.com")).await?;
    tokens
        .replace_for_identity(
            identity.id,
            &SecretString::from("contended"),
            Utc::now() + Duration::hours(1),
        )
        .await?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.take("contended").await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await??.is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_pg_server_login_refresh_replay(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn_with_pool(pool).await?;
    server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
    let tokens = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;

    let refresh = |secret: String| {
        let client = server.client().clone();
        let url = format!("{}/api/auth/refresh", server.url());
        async move {
            client
                .post(url)
                .json(&json!({ "refreshToken": secret }))
                .send()
                .await
        }
    };

    assert_eq!(refresh(tokens.refresh_token.clone()).await?.status(), StatusCode::OK);
    assert_eq!(
        refresh(tokens.refresh_token).await?.status(),
        StatusCode::FORBIDDEN
    );

    let health: serde_json::Value = reqwest::get(format!("{}/health", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(health["storage"], "postgres");

    Ok(())
}
