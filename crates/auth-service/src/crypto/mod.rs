//! Signing key, token signing, refresh secrets and password hashing.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AuthError;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use common::jwt::{key_id, AccessClaims, TokenVerifier, ACCESS_TOKEN_ALGORITHM, MIN_RSA_KEY_BITS};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{encode, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::Path;
use tracing::instrument;

/// Length of a refresh token secret before encoding.
pub const REFRESH_SECRET_BYTES: usize = 32;

/// The deployment's single RSA signing key pair.
///
/// The private half never leaves this struct; only the SPKI DER of the
/// public half is exposed.
pub struct SigningKeyPair {
    encoding_key: EncodingKey,
    public_key: RsaPublicKey,
    public_key_der: Vec<u8>,
    key_id: String,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("key_id", &self.key_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl SigningKeyPair {
    /// Parse a PKCS#8 PEM RSA private key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyLoadFailure` if the PEM is not an RSA key of
    /// at least [`MIN_RSA_KEY_BITS`] bits.
    pub fn from_pkcs8_pem(private_pem: &str) -> Result<Self, AuthError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
            .map_err(|e| AuthError::KeyLoadFailure(format!("Invalid private key PEM: {e}")))?;

        let bits = private_key.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(AuthError::KeyLoadFailure(format!(
                "RSA key is {bits} bits, at least {MIN_RSA_KEY_BITS} required"
            )));
        }

        let pkcs1 = private_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::KeyLoadFailure(format!("Private key encoding failed: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_der(pkcs1.as_bytes());

        let public_key = private_key.to_public_key();
        let public_key_der = public_key
            .to_public_key_der()
            .map_err(|e| AuthError::KeyLoadFailure(format!("Public key encoding failed: {e}")))?
            .as_bytes()
            .to_vec();

        Ok(Self {
            encoding_key,
            key_id: key_id(&public_key_der),
            public_key,
            public_key_der,
        })
    }

    /// Check that a separately supplied SPKI PEM public key matches.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyLoadFailure` on a parse failure or mismatch.
    pub fn ensure_public_pem_matches(&self, public_pem: &str) -> Result<(), AuthError> {
        let supplied = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| AuthError::KeyLoadFailure(format!("Invalid public key PEM: {e}")))?;

        if supplied != self.public_key {
            return Err(AuthError::KeyLoadFailure(
                "Public key does not match the private key".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the key pair from disk. Called once at boot.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyLoadFailure` if a file cannot be read or the
    /// keys are invalid or do not match.
    #[instrument(skip_all)]
    pub fn load(private_key_path: &Path, public_key_path: Option<&Path>) -> Result<Self, AuthError> {
        let private_pem = std::fs::read_to_string(private_key_path).map_err(|e| {
            AuthError::KeyLoadFailure(format!(
                "Cannot read private key {}: {e}",
                private_key_path.display()
            ))
        })?;
        let pair = Self::from_pkcs8_pem(&private_pem)?;

        if let Some(path) = public_key_path {
            let public_pem = std::fs::read_to_string(path).map_err(|e| {
                AuthError::KeyLoadFailure(format!("Cannot read public key {}: {e}", path.display()))
            })?;
            pair.ensure_public_pem_matches(&public_pem)?;
        }

        tracing::info!(target: "auth.crypto", key_id = %pair.key_id, "Signing key loaded");
        Ok(pair)
    }

    /// DER SubjectPublicKeyInfo of the public key.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Standard base64 of the SPKI DER, as served by the public-key endpoint.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(&self.public_key_der)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// A verifier trusting this key pair's public half.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if the public key cannot be re-parsed.
    pub fn verifier(&self) -> Result<TokenVerifier, AuthError> {
        TokenVerifier::from_public_key_der(&self.public_key_der)
            .map_err(|e| AuthError::Crypto(e.to_string()))
    }

    /// Sign access token claims with RS256.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if signing fails.
    #[instrument(skip_all)]
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        let mut header = Header::new(ACCESS_TOKEN_ALGORITHM);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.key_id.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {e}")))
    }
}

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| AuthError::Crypto(format!("Random bytes generation failed: {e}")))?;
    Ok(bytes)
}

/// Generate a refresh token secret (32 random bytes, base64url, no padding).
#[instrument(skip_all)]
pub fn generate_refresh_secret() -> Result<SecretString, AuthError> {
    let bytes = generate_random_bytes(REFRESH_SECRET_BYTES)?;
    Ok(SecretString::from(URL_SAFE_NO_PAD.encode(bytes)))
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `AuthError::Crypto` if the cost is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &SecretString, cost: u32) -> Result<String, AuthError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AuthError::Crypto(format!(
            "Invalid bcrypt cost: {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
        )));
    }

    bcrypt::hash(password.expose_secret(), cost)
        .map_err(|e| AuthError::Crypto(format!("Password hashing failed: {e}")))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &SecretString, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password.expose_secret(), hash)
        .map_err(|e| AuthError::Crypto(format!("Password verification failed: {e}")))
}
