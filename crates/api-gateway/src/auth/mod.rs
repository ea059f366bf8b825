//! Verification key bootstrap.

pub mod public_key_client;

pub use public_key_client::PublicKeyClient;
