use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use common_auth::{ROLE_ADMIN, ROLE_MANAGER, ROLE_USER};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::SecurityContext;
use crate::SecurityError;

/// Role names as carried in access tokens. Parsing is case-insensitive and
/// strips a leading `ROLE_`, so `role_admin`, `Admin` and `ADMIN` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Manager,
    User,
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match name {
            ROLE_ADMIN => Role::Admin,
            ROLE_MANAGER => Role::Manager,
            ROLE_USER => Role::User,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Manager => ROLE_MANAGER,
            Role::User => ROLE_USER,
            Role::Other(name) => name,
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(s))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::parse(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn ensure_role(ctx: &SecurityContext, required: Role) -> Result<(), SecurityError> {
    ensure_any_role(ctx, std::slice::from_ref(&required))
}

pub fn ensure_any_role(ctx: &SecurityContext, required: &[Role]) -> Result<(), SecurityError> {
    if !ctx.is_authenticated() {
        return Err(SecurityError::Unauthenticated);
    }
    if ctx.has_any_role(required) { return Ok(()); }
    warn!(subject = ?ctx.subject, ?required, roles = ?ctx.roles, "any_role_check_failed");
    Err(SecurityError::InsufficientRole { required: required.to_vec() })
}
