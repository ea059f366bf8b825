//! Fixed test IDs and credentials for deterministic tests

use uuid::Uuid;

// Identity IDs (100-199)
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);

// Credentials
pub const TEST_USER_EMAIL: &str = "alice@example.com";
pub const TEST_MAINTAINER_EMAIL: &str = "bob@example.com";
pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const TEST_WRONG_PASSWORD: &str = "incorrect-horse";
pub const TEST_PHONE_NUMBER: &str = "+15550100";

// Roles as they appear on the wire
pub const ROLE_USER: &str = "USER";
pub const ROLE_MAINTAINER: &str = "MAINTAINER";
pub const ROLE_ADMIN: &str = "ADMIN";
