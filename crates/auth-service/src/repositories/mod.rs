//! Storage behind the issuer: identities and refresh tokens.
//!
//! Each store is a trait with a PostgreSQL implementation and an in-memory
//! one used when no `DATABASE_URL` is configured and in tests.

pub mod identities;
pub mod refresh_tokens;

pub use identities::{IdentityStore, InMemoryIdentityStore, PgIdentityStore};
pub use refresh_tokens::{InMemoryRefreshTokenStore, PgRefreshTokenStore, RefreshTokenStore};
