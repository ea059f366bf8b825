//! Token issuance and refresh rotation.
//!
//! Every successful login, user signup, or refresh returns a fresh access
//! token and a fresh refresh token. A refresh secret is single use: `rotate`
//! atomically takes it out of the store before minting its successor.

use crate::config::Config;
use crate::crypto::{self, SigningKeyPair};
use crate::errors::AuthError;
use crate::models::{Identity, NewIdentity, SignUpRequest, TokenResponse};
use crate::observability::metrics::{
    record_bcrypt_duration, record_refresh_revocation, record_refresh_rotation,
    record_token_issuance,
};
use crate::repositories::{IdentityStore, RefreshTokenStore};
use chrono::{Duration, Utc};
use common::jwt::AccessClaims;
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Minimum password length at signup.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Lifetimes and hashing cost for the issuer.
#[derive(Debug, Clone, Copy)]
pub struct IssuerSettings {
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for IssuerSettings {
    fn from(config: &Config) -> Self {
        Self {
            access_token_ttl_seconds: config.access_token_ttl_seconds,
            refresh_token_ttl_seconds: config.refresh_token_ttl_seconds,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

pub struct IssuerService {
    keys: Arc<SigningKeyPair>,
    identities: Arc<dyn IdentityStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    settings: IssuerSettings,
    /// Verified against when the email is unknown, so every login costs one
    /// bcrypt verification.
    dummy_hash: String,
}

impl IssuerService {
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if the bcrypt cost is out of range.
    pub fn new(
        keys: Arc<SigningKeyPair>,
        identities: Arc<dyn IdentityStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        settings: IssuerSettings,
    ) -> Result<Self, AuthError> {
        let dummy_hash = crypto::hash_password(
            &SecretString::from("dummy-password-never-matches"),
            settings.bcrypt_cost,
        )?;

        Ok(Self {
            keys,
            identities,
            refresh_tokens,
            settings,
            dummy_hash,
        })
    }

    pub fn keys(&self) -> &SigningKeyPair {
        &self.keys
    }

    pub fn identities(&self) -> &Arc<dyn IdentityStore> {
        &self.identities
    }

    pub fn refresh_tokens(&self) -> &Arc<dyn RefreshTokenStore> {
        &self.refresh_tokens
    }

    pub fn settings(&self) -> IssuerSettings {
        self.settings
    }

    /// Mint a token pair for an identity, replacing any refresh token it
    /// already holds.
    #[instrument(skip_all, fields(role = %identity.role))]
    pub async fn issue_for_new_identity(
        &self,
        identity: &Identity,
    ) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();

        let secret = crypto::generate_refresh_secret()?;
        let refresh_expires_at = now + Duration::seconds(self.settings.refresh_token_ttl_seconds);
        let stored = self
            .refresh_tokens
            .replace_for_identity(identity.id, &secret, refresh_expires_at)
            .await?;

        let claims = AccessClaims {
            sub: identity.id.to_string(),
            role: identity.role,
            email: identity.email.clone(),
            phone_number: Some(identity.phone_number.clone()).filter(|p| !p.is_empty()),
            iat: now.timestamp(),
            exp: now.timestamp() + self.settings.access_token_ttl_seconds,
        };
        let access_token = self.keys.sign(&claims)?;

        Ok(TokenResponse {
            access_token,
            refresh_token: stored.secret.expose_secret().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_token_ttl_seconds,
        })
    }

    /// Verify email and password, then issue a token pair.
    ///
    /// Unknown email, wrong password and inactive identity all fail with
    /// the same `InvalidCredentials`.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let result = self.authenticate_inner(email, password).await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_token_issuance("login", status, start.elapsed());
        result
    }

    async fn authenticate_inner(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, AuthError> {
        let identity = self
            .identities
            .find_by_email(&normalize_email(email))
            .await?;

        let hash_to_verify = identity
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |i| i.password_hash.as_str());

        let bcrypt_start = Instant::now();
        let password_valid = crypto::verify_password(password, hash_to_verify)?;
        record_bcrypt_duration("verify", bcrypt_start.elapsed());

        let identity = identity.ok_or(AuthError::InvalidCredentials)?;
        if !password_valid {
            tracing::debug!(target: "auth.issuer", "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !identity.is_active {
            tracing::debug!(target: "auth.issuer", role = %identity.role, "Login rejected: identity inactive");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_for_new_identity(&identity).await
    }

    /// Exchange a refresh secret for a new token pair.
    ///
    /// The presented secret is consumed whatever the outcome.
    #[instrument(skip_all)]
    pub async fn rotate(&self, secret: &SecretString) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let result = self.rotate_inner(secret).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AuthError::RefreshTokenNotFound) => "not_found",
            Err(AuthError::RefreshTokenExpired) => "expired",
            Err(_) => "error",
        };
        record_refresh_rotation(outcome);
        record_token_issuance(
            "refresh",
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        result
    }

    async fn rotate_inner(&self, secret: &SecretString) -> Result<TokenResponse, AuthError> {
        let Some(token) = self.refresh_tokens.take(secret.expose_secret()).await? else {
            tracing::debug!(target: "auth.issuer", "Refresh rejected: token not found");
            return Err(AuthError::RefreshTokenNotFound);
        };

        if token.is_expired_at(Utc::now()) {
            tracing::debug!(target: "auth.issuer", "Refresh rejected: token expired");
            return Err(AuthError::RefreshTokenExpired);
        }

        let identity = match self.identities.find_by_id(token.identity_id).await? {
            Some(identity) if identity.is_active => identity,
            _ => {
                tracing::warn!(
                    target: "auth.issuer",
                    "Refresh rejected: owning identity missing or inactive"
                );
                return Err(AuthError::RefreshTokenNotFound);
            }
        };

        self.issue_for_new_identity(&identity).await
    }

    /// Discard a refresh secret (logout). Unknown secrets are not an error.
    #[instrument(skip_all)]
    pub async fn revoke(&self, secret: &SecretString) -> Result<(), AuthError> {
        let found = self
            .refresh_tokens
            .take(secret.expose_secret())
            .await?
            .is_some();
        record_refresh_revocation(found);
        Ok(())
    }

    /// Register an active `USER` and log them in.
    #[instrument(skip_all)]
    pub async fn signup_user(&self, request: SignUpRequest) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let result = async {
            let identity = self.create_identity(request, Role::User, true).await?;
            tracing::info!(target: "auth.issuer", user_id = %identity.id, "User registered");
            self.issue_for_new_identity(&identity).await
        }
        .await;

        record_token_issuance(
            "signup",
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        result
    }

    /// Register an inactive `MAINTAINER` pending approval. No tokens are
    /// issued until an administrator activates the account.
    #[instrument(skip_all)]
    pub async fn signup_maintainer(&self, request: SignUpRequest) -> Result<(), AuthError> {
        let identity = self.create_identity(request, Role::Maintainer, false).await?;
        tracing::info!(
            target: "auth.issuer",
            user_id = %identity.id,
            "Maintainer registered, pending approval"
        );
        Ok(())
    }

    async fn create_identity(
        &self,
        request: SignUpRequest,
        role: Role,
        is_active: bool,
    ) -> Result<Identity, AuthError> {
        validate_signup(&request)?;

        let bcrypt_start = Instant::now();
        let password_hash = crypto::hash_password(&request.password, self.settings.bcrypt_cost)?;
        record_bcrypt_duration("hash", bcrypt_start.elapsed());

        self.identities
            .create(NewIdentity {
                email: normalize_email(&request.email),
                phone_number: request.phone_number.trim().to_string(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                password_hash,
                role,
                is_active,
            })
            .await
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate_signup(request: &SignUpRequest) -> Result<(), AuthError> {
    let required = [
        (&request.first_name, "First name cannot be blank"),
        (&request.last_name, "Last name cannot be blank"),
        (&request.email, "Email cannot be blank"),
        (&request.phone_number, "Phone number cannot be blank"),
    ];
    for (value, message) in required {
        if value.trim().is_empty() {
            return Err(AuthError::BadRequest(message.to_string()));
        }
    }

    if !is_plausible_email(request.email.trim()) {
        return Err(AuthError::BadRequest(
            "Please provide a valid email address".to_string(),
        ));
    }

    if request.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    Ok(())
}
