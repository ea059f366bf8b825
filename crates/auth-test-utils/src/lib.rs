//! # Auth Test Utilities
//!
//! Shared test utilities for the auth service and the API gateway.
//!
//! This crate provides:
//! - Fixed RSA key fixtures (checked-in PEM files, no key generation in tests)
//! - Test data builders (TestTokenBuilder)
//! - Server test harness (TestAuthServer for E2E tests)
//! - Fixed test IDs and credentials
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestAuthServer::spawn().await?;
//!     server.create_user(TEST_USER_EMAIL, TEST_PASSWORD).await?;
//!
//!     let tokens = server.login(TEST_USER_EMAIL, TEST_PASSWORD).await?;
//!     tokens.access_token
//!         .assert_valid_jwt()
//!         .assert_has_role("USER")
//!         .assert_signed_by(&signing_key_id());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
