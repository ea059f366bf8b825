//! Access token verification shared by the issuer and the gateway.
//!
//! Access tokens are compact JWS values signed with RS256. Any holder of the
//! issuer's public key can verify them offline, which is what lets the
//! gateway authenticate requests without calling back to the auth service.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only RS256 is accepted; the `alg` header cannot downgrade verification
//! - Every [`TokenError`] renders the same generic message
//! - `sub`, `email` and `phone_number` are redacted in `Debug` output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::TokenVerifier;
//!
//! let verifier = TokenVerifier::from_base64_der(&response.public_key)?;
//! let claims = verifier.verify(bearer)?;
//! ```

use crate::types::Role;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical access tokens are well under 1KB (RS256 signature is 342 base64
/// characters). Larger values are rejected before any base64 decoding or
/// signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default tolerance for `iat` values in the future (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound for a configured clock skew (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Smallest RSA modulus accepted for signing or verification.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Signing algorithm for every access token.
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::RS256;

// =============================================================================
// Error Types
// =============================================================================

/// Reasons an access token failed verification.
///
/// The variants exist for logging and metrics only. All of them display the
/// same message so a caller cannot tell a forged token from an expired one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature does not verify against the public key.
    #[error("The access token is invalid or expired")]
    InvalidSignature,

    /// Signature is valid but `exp` is in the past.
    #[error("The access token is invalid or expired")]
    Expired,

    /// Oversized, structurally broken, or missing required claims.
    #[error("The access token is invalid or expired")]
    Malformed,

    /// `iat` is further in the future than the allowed clock skew.
    #[error("The access token is invalid or expired")]
    IssuedInFuture,
}

impl TokenError {
    /// Stable label for logs and the `outcome` metric dimension.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::Malformed => "malformed",
            TokenError::IssuedInFuture => "issued_in_future",
        }
    }
}

/// Failure to turn distributed key material into a verifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyError {
    #[error("Public key is not valid base64: {0}")]
    Encoding(String),

    #[error("Public key is not a valid RSA SubjectPublicKeyInfo: {0}")]
    InvalidKey(String),

    #[error("RSA public key is {bits} bits, at least {MIN_RSA_KEY_BITS} required")]
    TooWeak { bits: usize },
}

// =============================================================================
// Claims
// =============================================================================

/// Claims carried by every access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity id (UUID string) - redacted in Debug output.
    pub sub: String,

    pub role: Role,

    #[serde(default)]
    pub email: String,

    #[serde(
        rename = "phoneNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub phone_number: Option<String>,

    /// Issued-at (Unix epoch seconds).
    pub iat: i64,

    /// Expiry (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("sub", &"[REDACTED]")
            .field("role", &self.role)
            .field("email", &"[REDACTED]")
            .field("phone_number", &self.phone_number.as_ref().map(|_| "[REDACTED]"))
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Validate the `iat` claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `TokenError::IssuedInFuture` if `iat` is more than `clock_skew`
/// ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), TokenError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), TokenError> {
    // Bounded by MAX_CLOCK_SKEW at configuration time
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(TokenError::IssuedInFuture);
    }

    Ok(())
}

/// Validate the `exp` claim with zero leeway: a token is valid through the
/// second named by `exp`.
///
/// # Errors
///
/// Returns `TokenError::Expired` once the current time is past `exp`.
pub fn validate_exp(exp: i64) -> Result<(), TokenError> {
    let now = chrono::Utc::now().timestamp();
    validate_exp_at(exp, now)
}

/// Deterministic `exp` validation against an explicit `now` timestamp.
pub(crate) fn validate_exp_at(exp: i64, now: i64) -> Result<(), TokenError> {
    if now > exp {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            "Token rejected: expired"
        );
        return Err(TokenError::Expired);
    }

    Ok(())
}

/// Key id for a public key: hex of the first 8 bytes of SHA-256 over its
/// SubjectPublicKeyInfo DER.
#[must_use]
pub fn key_id(public_key_der: &[u8]) -> String {
    let digest = Sha256::digest(public_key_der);
    hex::encode(digest.get(..8).unwrap_or_default())
}

/// Three segments, with header and payload decoding to JSON objects.
fn check_structure(token: &str) -> Result<(), TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: not three segments");
        return Err(TokenError::Malformed);
    };

    if signature.is_empty() {
        return Err(TokenError::Malformed);
    }

    for segment in [header, payload] {
        let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token segment is not base64url");
            TokenError::Malformed
        })?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token segment is not JSON");
            TokenError::Malformed
        })?;
        if !value.is_object() {
            return Err(TokenError::Malformed);
        }
    }

    Ok(())
}

fn map_decode_error(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        // Header and payload were checked already, so base64 failures here
        // come from the signature segment.
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::Base64(_)
        | ErrorKind::Crypto(_) => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}

// =============================================================================
// Verifier
// =============================================================================

/// Verifies access tokens with a single RSA public key.
///
/// Built once from the distributed key and shared read-only afterwards.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    clock_skew: Duration,
    key_id: String,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("key_id", &self.key_id)
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Build a verifier from a DER-encoded SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns `PublicKeyError` if the DER is not an RSA public key or the
    /// modulus is shorter than [`MIN_RSA_KEY_BITS`].
    pub fn from_public_key_der(der: &[u8]) -> Result<Self, PublicKeyError> {
        let public_key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| PublicKeyError::InvalidKey(e.to_string()))?;

        let bits = public_key.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(PublicKeyError::TooWeak { bits });
        }

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|e| PublicKeyError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
        // Expiry is checked after decoding so the boundary is exact
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            decoding_key,
            validation,
            clock_skew: DEFAULT_CLOCK_SKEW,
            key_id: key_id(der),
        })
    }

    /// Build a verifier from the `publicKey` field of the public-key endpoint
    /// (standard base64 of the SPKI DER).
    ///
    /// # Errors
    ///
    /// Returns `PublicKeyError::Encoding` for bad base64, otherwise as
    /// [`TokenVerifier::from_public_key_der`].
    pub fn from_base64_der(encoded: &str) -> Result<Self, PublicKeyError> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PublicKeyError::Encoding(e.to_string()))?;
        Self::from_public_key_der(&der)
    }

    /// Override the `iat` clock skew tolerance (clamped to [`MAX_CLOCK_SKEW`]).
    #[must_use]
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew.min(MAX_CLOCK_SKEW);
        self
    }

    /// Key id of the public key this verifier trusts.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Verify an access token and return its claims.
    ///
    /// Checks run in order: size, structure, signature, expiry (no leeway),
    /// claim shape, then `iat` against the clock skew.
    ///
    /// # Errors
    ///
    /// Returns the specific [`TokenError`]; callers must not surface the
    /// distinction to clients.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenError::Malformed);
        }

        check_structure(token)?;

        let data = jsonwebtoken::decode::<serde_json::Value>(
            token,
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| {
            let mapped = map_decode_error(&e);
            tracing::debug!(
                target: "common.jwt",
                error = %e,
                kind = mapped.kind(),
                "Token verification failed"
            );
            mapped
        })?;

        let exp = data
            .claims
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or(TokenError::Malformed)?;
        validate_exp(exp)?;

        let claims: AccessClaims =
            serde_json::from_value(data.claims).map_err(|_| TokenError::Malformed)?;
        validate_iat(claims.iat, self.clock_skew)?;

        Ok(claims)
    }
}

// =============================================================================
// Tests
// =============================================================================
