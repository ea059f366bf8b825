//! Fixed RSA key fixtures for testing
//!
//! Keys are checked-in PEM files so tests never pay for RSA key generation
//! and always see the same key ids.
//!
//! - `signing_key` - the issuer's key pair (RSA-2048)
//! - `foreign_key` - an unrelated key pair, for "signed by someone else"
//! - `weak_key` - RSA-1024, below the accepted minimum

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::EncodingKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// PKCS#8 PEM of the issuer signing key.
pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");

/// SPKI PEM matching [`SIGNING_KEY_PEM`].
pub const SIGNING_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/signing_key.pub.pem");

/// PKCS#8 PEM of a key the issuer does not own.
pub const FOREIGN_KEY_PEM: &str = include_str!("../fixtures/foreign_key.pem");

/// SPKI PEM matching [`FOREIGN_KEY_PEM`].
pub const FOREIGN_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/foreign_key.pub.pem");

/// PKCS#8 PEM of an RSA-1024 key.
pub const WEAK_KEY_PEM: &str = include_str!("../fixtures/weak_key.pem");

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// RS256 encoding key for a PKCS#8 PEM fixture.
pub fn encoding_key_from_pem(private_pem: &str) -> Result<EncodingKey, FixtureError> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
        .map_err(|e| FixtureError::Crypto(format!("Invalid private key PEM: {e}")))?;
    let pkcs1 = private_key
        .to_pkcs1_der()
        .map_err(|e| FixtureError::Crypto(format!("PKCS#1 encoding failed: {e}")))?;
    Ok(EncodingKey::from_rsa_der(pkcs1.as_bytes()))
}

/// SPKI DER for an SPKI PEM fixture.
pub fn public_key_der_from_pem(public_pem: &str) -> Result<Vec<u8>, FixtureError> {
    let public_key = RsaPublicKey::from_public_key_pem(public_pem)
        .map_err(|e| FixtureError::Crypto(format!("Invalid public key PEM: {e}")))?;
    let der = public_key
        .to_public_key_der()
        .map_err(|e| FixtureError::Crypto(format!("SPKI encoding failed: {e}")))?;
    Ok(der.as_bytes().to_vec())
}

/// Encoding key for the issuer signing key.
pub fn signing_encoding_key() -> EncodingKey {
    encoding_key_from_pem(SIGNING_KEY_PEM).expect("signing key fixture is valid")
}

/// Encoding key for the foreign key.
pub fn foreign_encoding_key() -> EncodingKey {
    encoding_key_from_pem(FOREIGN_KEY_PEM).expect("foreign key fixture is valid")
}

/// SPKI DER of the issuer's public key.
pub fn signing_public_key_der() -> Vec<u8> {
    public_key_der_from_pem(SIGNING_PUBLIC_KEY_PEM).expect("signing public key fixture is valid")
}

/// Standard base64 of the issuer's SPKI DER, as the public-key endpoint
/// serves it.
pub fn signing_public_key_base64() -> String {
    STANDARD.encode(signing_public_key_der())
}

/// SPKI DER of the foreign public key.
pub fn foreign_public_key_der() -> Vec<u8> {
    public_key_der_from_pem(FOREIGN_PUBLIC_KEY_PEM).expect("foreign public key fixture is valid")
}

/// Key id (`kid`) of the issuer's signing key.
pub fn signing_key_id() -> String {
    common::jwt::key_id(&signing_public_key_der())
}
