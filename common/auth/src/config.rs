use std::env;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Duration;

use crate::error::{AuthError, AuthResult};

/// Minimum HMAC key length (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;
pub const DEFAULT_ACCESS_TTL_MS: u64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_REFRESH_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;
/// Upper bound for either token lifetime (ten years).
pub const MAX_TTL_MS: u64 = 10 * 365 * 24 * 60 * 60 * 1000;
/// Upper bound for clock-skew leeway (one day).
pub const MAX_LEEWAY_SECONDS: u64 = 24 * 60 * 60;

/// Shared HS256 key material. Debug output never shows the bytes.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(AuthError::WeakSecret {
                min: MIN_SECRET_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Accepts either raw text or `base64:<standard base64>`.
    pub fn parse(value: &str) -> AuthResult<Self> {
        match value.trim().strip_prefix("base64:") {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|err| AuthError::Config("JWT_SECRET", err.to_string()))?;
                Self::new(bytes)
            }
            None => Self::new(value.trim().as_bytes().to_vec()),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Runtime configuration shared by the issuer and every verifying service.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SigningSecret,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
    /// Allowable clock skew in seconds when checking `exp`. Zero means strict.
    pub leeway_seconds: u32,
    /// Consult a revocation list during verification.
    pub revocation_enabled: bool,
}

impl JwtConfig {
    /// Construct config with default lifetimes (24h access, 7d refresh) and no leeway.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            access_ttl_ms: DEFAULT_ACCESS_TTL_MS,
            refresh_ttl_ms: DEFAULT_REFRESH_TTL_MS,
            leeway_seconds: 0,
            revocation_enabled: false,
        }
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_access_ttl_ms(mut self, ms: u64) -> Self {
        self.access_ttl_ms = ms;
        self
    }

    pub fn with_refresh_ttl_ms(mut self, ms: u64) -> Self {
        self.refresh_ttl_ms = ms;
        self
    }

    pub fn with_revocation(mut self, enabled: bool) -> Self {
        self.revocation_enabled = enabled;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::milliseconds(saturating_i64(self.access_ttl_ms))
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::milliseconds(saturating_i64(self.refresh_ttl_ms))
    }

    pub fn leeway(&self) -> Duration {
        Duration::seconds(i64::from(self.leeway_seconds))
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`JwtConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AuthError::Config("JWT_SECRET", "must be set".to_string()))?;
        let secret = SigningSecret::parse(&secret)?;

        let access_ttl_ms = parse_number(&lookup, "JWT_ACCESS_TOKEN_TTL_MS")?
            .unwrap_or(DEFAULT_ACCESS_TTL_MS);
        let refresh_ttl_ms = parse_number(&lookup, "JWT_REFRESH_TOKEN_TTL_MS")?
            .unwrap_or(DEFAULT_REFRESH_TTL_MS);
        if access_ttl_ms < 1000 {
            return Err(AuthError::Config(
                "JWT_ACCESS_TOKEN_TTL_MS",
                "must be at least 1000".to_string(),
            ));
        }
        if access_ttl_ms > MAX_TTL_MS {
            return Err(AuthError::Config(
                "JWT_ACCESS_TOKEN_TTL_MS",
                format!("must not exceed {MAX_TTL_MS}"),
            ));
        }
        if refresh_ttl_ms > MAX_TTL_MS {
            return Err(AuthError::Config(
                "JWT_REFRESH_TOKEN_TTL_MS",
                format!("must not exceed {MAX_TTL_MS}"),
            ));
        }
        if refresh_ttl_ms < access_ttl_ms {
            return Err(AuthError::Config(
                "JWT_REFRESH_TOKEN_TTL_MS",
                "must not be shorter than the access token lifetime".to_string(),
            ));
        }

        let leeway_seconds = parse_number(&lookup, "JWT_LEEWAY_SECONDS")?.unwrap_or(0);
        if leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(AuthError::Config(
                "JWT_LEEWAY_SECONDS",
                format!("must not exceed {MAX_LEEWAY_SECONDS}"),
            ));
        }
        let leeway_seconds = u32::try_from(leeway_seconds)
            .map_err(|err| AuthError::Config("JWT_LEEWAY_SECONDS", err.to_string()))?;
        let revocation_enabled = lookup("JWT_REVOCATION_ENABLED")
            .map(|value| bool_flag(&value))
            .unwrap_or(false);

        Ok(Self {
            secret,
            access_ttl_ms,
            refresh_ttl_ms,
            leeway_seconds,
            revocation_enabled,
        })
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_number<F>(lookup: &F, key: &'static str) -> AuthResult<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| AuthError::Config(key, err.to_string())),
        _ => Ok(None),
    }
}

fn bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
