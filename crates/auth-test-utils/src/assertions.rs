//! Custom test assertions for expressive tests
//!
//! Decodes access tokens without verifying them, so failures point at the
//! claim that is wrong rather than at a signature error.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

fn decode_segment<T: for<'de> Deserialize<'de>>(token: &str, index: usize, what: &str) -> T {
    let segment = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no {what} segment"));
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT {what}: {e}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("Failed to parse JWT {what} JSON: {e}"))
}

fn header(token: &str) -> JwtHeader {
    decode_segment(token, 0, "header")
}

fn claims(token: &str) -> JwtClaims {
    decode_segment(token, 1, "payload")
}

/// Custom assertions for access tokens
///
/// # Example
/// ```rust,ignore
/// tokens.access_token
///     .assert_valid_jwt()
///     .assert_has_role("USER")
///     .assert_expires_in(900);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is an RS256 JWT with a decodable payload
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the `role` claim
    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert that the token was signed by the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token expires within the specified seconds (±5s)
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {parts}"
        );

        let header = header(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        let claims = claims(self);
        assert!(
            claims.iat <= claims.exp,
            "iat {} is after exp {}",
            claims.iat,
            claims.exp
        );

        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.role, role,
            "Expected role '{role}', got '{}'",
            claims.role
        );
        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{key_id}', got {:?}",
            header.kid
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims = claims(self);
        let expires_in = claims.exp - chrono::Utc::now().timestamp();

        assert!(
            (expires_in - seconds).abs() <= 5,
            "Expected token to expire in {seconds} seconds, but expires in {expires_in} seconds"
        );
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{subject}', got '{}'",
            claims.sub
        );
        self
    }
}
