//! Shared types for the Maintenance Match auth core.
//!
//! Used by both the auth service (which issues tokens) and the API gateway
//! (which verifies them).

#![warn(clippy::pedantic)]

/// Identity headers injected by the gateway and their extractor
pub mod identity;
/// Access token claims and RS256 verification
pub mod jwt;
/// Secret wrappers that redact on Debug
pub mod secret;
/// Roles and wire types
pub mod types;
