//! Redacting wrapper for passwords and refresh token secrets.
//!
//! `SecretString` prints `[REDACTED]` under `Debug` and is zeroized on
//! drop. Request types hold passwords and refresh tokens as
//! `SecretString` so that `#[derive(Debug)]` and `tracing` fields stay safe;
//! reading the value requires an explicit `expose_secret()`.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let password = SecretString::from("hunter2");
//! assert!(format!("{password:?}").contains("[REDACTED]"));
//! assert_eq!(password.expose_secret(), "hunter2");
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};
