//! Builder patterns for test data construction
//!
//! Produces access tokens signed with the fixture keys, including ones the
//! issuer would never mint (expired, future-dated, unknown role).

use crate::crypto_fixtures::{foreign_encoding_key, signing_encoding_key, signing_key_id};
use crate::test_ids::{ROLE_USER, TEST_USER_ALICE};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Builder for creating test access tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user(TEST_USER_ALICE)
///     .with_role("MAINTAINER")
///     .expires_in(60)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    role: Option<String>,
    email: String,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: TEST_USER_ALICE.to_string(),
            role: Some(ROLE_USER.to_string()),
            email: crate::test_ids::TEST_USER_EMAIL.to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.sub = user_id.to_string();
        self
    }

    /// Set a raw subject string, which need not be a UUID
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the role as it appears on the wire
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Omit the role claim
    pub fn without_role(mut self) -> Self {
        self.role = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        if let Some(role) = self.role {
            claims.insert("role".to_string(), json!(role));
        }
        claims.insert("email".to_string(), json!(self.email));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("exp".to_string(), json!(self.exp));
        Value::Object(claims)
    }

    /// Sign with the issuer's fixture key (RS256, with its `kid`)
    pub fn sign(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(signing_key_id());
        sign_claims(&header, &self.build(), &signing_encoding_key())
    }

    /// Sign with a key the issuer does not own
    pub fn sign_with_foreign_key(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        sign_claims(&header, &self.build(), &foreign_encoding_key())
    }

    /// Sign with HS256 using `secret` (algorithm confusion attempts)
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        sign_claims(
            &Header::new(Algorithm::HS256),
            &self.build(),
            &EncodingKey::from_secret(secret),
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn sign_claims(header: &Header, claims: &Value, key: &EncodingKey) -> String {
    encode(header, claims, key).expect("test token signing should succeed")
}
