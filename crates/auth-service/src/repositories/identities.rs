//! Identity directory.
//!
//! Registration and approval workflows live elsewhere; the auth core only
//! needs lookup by email or id and creation at signup.

use crate::errors::AuthError;
use crate::models::{Identity, NewIdentity};
use async_trait::async_trait;
use common::types::Role;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    /// Insert a new identity.
    ///
    /// Returns `AuthError::EmailInUse` if the email is already registered.
    async fn create(&self, identity: NewIdentity) -> Result<Identity, AuthError>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    phone_number: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    is_active: bool,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = AuthError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(Identity {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
        })
    }
}

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, email, phone_number, first_name, last_name,
                   password_hash, role, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by email: {e}")))?;

        row.map(Identity::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, email, phone_number, first_name, last_name,
                   password_hash, role, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by id: {e}")))?;

        row.map(Identity::try_from).transpose()
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO users (id, email, phone_number, first_name, last_name,
                               password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, email, phone_number, first_name, last_name,
                      password_hash, role, is_active
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.email)
        .bind(&identity.phone_number)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.password_hash)
        .bind(identity.role.as_str())
        .bind(identity.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("users_email_unique") => {
                AuthError::EmailInUse
            }
            _ => AuthError::Database(format!("Failed to create user: {e}")),
        })?;

        Identity::try_from(row)
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
struct Directory {
    by_id: HashMap<Uuid, Identity>,
    id_by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct InMemoryIdentityStore {
    directory: RwLock<Directory>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let directory = self.directory.read().await;
        Ok(directory
            .id_by_email
            .get(email)
            .and_then(|id| directory.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        Ok(self.directory.read().await.by_id.get(&id).cloned())
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        let mut directory = self.directory.write().await;

        if directory.id_by_email.contains_key(&identity.email) {
            return Err(AuthError::EmailInUse);
        }

        let created = Identity {
            id: Uuid::new_v4(),
            email: identity.email,
            phone_number: identity.phone_number,
            first_name: identity.first_name,
            last_name: identity.last_name,
            password_hash: identity.password_hash,
            role: identity.role,
            is_active: identity.is_active,
        };

        directory
            .id_by_email
            .insert(created.email.clone(), created.id);
        directory.by_id.insert(created.id, created.clone());

        Ok(created)
    }
}
