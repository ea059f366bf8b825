//! Common data types for Maintenance Match services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Header carrying the authenticated identity id, injected by the gateway.
///
/// Downstream services trust this header only because they are reachable
/// exclusively through the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated role, injected by the gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role of an identity, carried in the `role` claim of every access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A customer posting maintenance jobs
    User,
    /// A maintainer taking jobs (active only after approval)
    Maintainer,
    /// A platform administrator
    Admin,
}

impl Role {
    /// Wire representation used in claims and the `X-User-Role` header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Maintainer => "MAINTAINER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "MAINTAINER" => Ok(Role::Maintainer),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Body of `GET /api/auth/public-key`.
///
/// `public_key` is the base64 (standard alphabet, padded) encoding of the
/// DER SubjectPublicKeyInfo of the issuer's RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}
