use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-focused representation of verified JWT claims.
///
/// Timestamps carry whole seconds only, matching what survives the wire.
/// `token_id` is minted per token so two tokens issued in the same second
/// never collide in the revocation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: Uuid,
    pub roles: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kind: TokenKind,
    pub token_id: Option<Uuid>,
}

impl Claims {
    /// Claims for an access token. Roles are deduplicated and sorted.
    pub fn access<I, R>(
        subject: Uuid,
        roles: I,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> AuthResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let mut roles: Vec<String> = roles.into_iter().map(Into::into).collect();
        roles.sort();
        roles.dedup();
        Self::mint(subject, roles, issued_at, ttl, TokenKind::Access)
    }

    /// Claims for a refresh token; refresh tokens never carry roles.
    pub fn refresh(subject: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> AuthResult<Self> {
        Self::mint(subject, Vec::new(), issued_at, ttl, TokenKind::Refresh)
    }

    fn mint(
        subject: Uuid,
        roles: Vec<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        kind: TokenKind,
    ) -> AuthResult<Self> {
        let issued_at = truncate_to_seconds(issued_at);
        let expires_at = issued_at
            .checked_add_signed(Duration::seconds(ttl.num_seconds()))
            .ok_or_else(|| {
                AuthError::Config("token lifetime", format!("{ttl} overflows the expiry time"))
            })?;
        Ok(Self {
            subject,
            roles,
            issued_at,
            expires_at,
            kind,
            token_id: Some(Uuid::new_v4()),
        })
    }

    /// Convenience helper for role checks.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|value| value == role)
    }

    /// A token is usable only while `now < expires_at + leeway`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expires_at.checked_add_signed(leeway) {
            Some(deadline) => now >= deadline,
            // Past the representable range; `now` can never reach it.
            None => false,
        }
    }

    /// Whole seconds until expiry, never negative.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

fn truncate_to_seconds(value: DateTime<Utc>) -> DateTime<Utc> {
    value.with_nanosecond(0).unwrap_or(value)
}

/// Wire form of the claim set. Unknown claims are ignored on decode.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    sub: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roles: Vec<String>,
    iat: i64,
    exp: i64,
    token_kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

impl From<&Claims> for ClaimsRepr {
    fn from(value: &Claims) -> Self {
        Self {
            sub: value.subject.to_string(),
            roles: value.roles.clone(),
            iat: value.issued_at.timestamp(),
            exp: value.expires_at.timestamp(),
            token_kind: value.kind,
            jti: value.token_id.map(|id| id.to_string()),
        }
    }
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let subject = Uuid::parse_str(&value.sub).map_err(|_| AuthError::Malformed)?;
        let issued_at = Utc
            .timestamp_opt(value.iat, 0)
            .single()
            .ok_or(AuthError::Malformed)?;
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or(AuthError::Malformed)?;
        let token_id = value
            .jti
            .map(|raw| Uuid::parse_str(&raw).map_err(|_| AuthError::Malformed))
            .transpose()?;

        Ok(Self {
            subject,
            roles: value.roles,
            issued_at,
            expires_at,
            kind: value.token_kind,
            token_id,
        })
    }
}
