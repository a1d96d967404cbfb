//! Canonical role names carried in the `roles` claim.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_USER: &str = "USER";
