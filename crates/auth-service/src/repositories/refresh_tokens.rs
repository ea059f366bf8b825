//! Refresh token store.
//!
//! Holds at most one live refresh token per identity. Consuming a token is a
//! single atomic `take` (delete-and-return), so two concurrent rotations of
//! the same secret cannot both succeed.

use crate::errors::AuthError;
use crate::models::RefreshToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Delete any token owned by `identity_id` and store a new one, atomically.
    async fn replace_for_identity(
        &self,
        identity_id: Uuid,
        secret: &SecretString,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError>;

    /// Remove and return the token with this secret, if present.
    ///
    /// Expired tokens are returned too; the caller decides, but the row is
    /// gone either way.
    async fn take(&self, secret: &str) -> Result<Option<RefreshToken>, AuthError>;

    async fn count_for_identity(&self, identity_id: Uuid) -> Result<i64, AuthError>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            secret: SecretString::from(row.token),
            identity_id: row.user_id,
            expires_at: row.expires_at,
        }
    }
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn replace_for_identity(
        &self,
        identity_id: Uuid,
        secret: &SecretString,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        // UNIQUE(user_id) turns the replace into one upsert; concurrent
        // callers serialize on the row lock.
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET id = EXCLUDED.id,
                token = EXCLUDED.token,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            RETURNING id, token, user_id, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(secret.expose_secret())
        .bind(identity_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to store refresh token: {e}")))?;

        Ok(row.into())
    }

    async fn take(&self, secret: &str) -> Result<Option<RefreshToken>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token = $1
            RETURNING id, token, user_id, expires_at
            "#,
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to take refresh token: {e}")))?;

        Ok(row.map(Into::into))
    }

    async fn count_for_identity(&self, identity_id: Uuid) -> Result<i64, AuthError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
                .bind(identity_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AuthError::Database(format!("Failed to count refresh tokens: {e}"))
                })?;

        Ok(count)
    }
}

// ============================================================================
// In-memory
// ============================================================================

struct StoredToken {
    id: Uuid,
    identity_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    by_secret: HashMap<String, StoredToken>,
    secret_by_identity: HashMap<Uuid, String>,
}

/// Process-local store for development and tests.
///
/// Both indexes sit behind one mutex so every operation is atomic.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tables: Mutex<Tables>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn replace_for_identity(
        &self,
        identity_id: Uuid,
        secret: &SecretString,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let mut tables = self.tables.lock().await;

        if tables.by_secret.contains_key(secret.expose_secret()) {
            return Err(AuthError::Database(
                "Refresh token secret collision".to_string(),
            ));
        }

        if let Some(previous) = tables.secret_by_identity.remove(&identity_id) {
            tables.by_secret.remove(&previous);
        }

        let id = Uuid::new_v4();
        tables.by_secret.insert(
            secret.expose_secret().to_string(),
            StoredToken {
                id,
                identity_id,
                expires_at,
            },
        );
        tables
            .secret_by_identity
            .insert(identity_id, secret.expose_secret().to_string());

        Ok(RefreshToken {
            id,
            secret: SecretString::from(secret.expose_secret().to_string()),
            identity_id,
            expires_at,
        })
    }

    async fn take(&self, secret: &str) -> Result<Option<RefreshToken>, AuthError> {
        let mut tables = self.tables.lock().await;

        let Some(stored) = tables.by_secret.remove(secret) else {
            return Ok(None);
        };
        tables.secret_by_identity.remove(&stored.identity_id);

        Ok(Some(RefreshToken {
            id: stored.id,
            secret: SecretString::from(secret.to_string()),
            identity_id: stored.identity_id,
            expires_at: stored.expires_at,
        }))
    }

    async fn count_for_identity(&self, identity_id: Uuid) -> Result<i64, AuthError> {
        let tables = self.tables.lock().await;
        Ok(i64::from(tables.secret_by_identity.contains_key(&identity_id)))
    }
}
