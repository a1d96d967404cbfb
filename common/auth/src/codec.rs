use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{Claims, ClaimsRepr};
use crate::config::{JwtConfig, SigningSecret};
use crate::error::{AuthError, AuthResult};

/// HS256 encoder/decoder over the closed claim set.
///
/// Built once per process and shared behind an `Arc`; it holds no mutable state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    leeway: Duration,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret, leeway_seconds: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `decode_at`.
        // Audience is not part of the claim set.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            leeway: Duration::seconds(i64::from(leeway_seconds)),
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.leeway_seconds)
    }

    pub fn encode(&self, claims: &Claims) -> AuthResult<String> {
        let repr = ClaimsRepr::from(claims);
        encode(&Header::new(Algorithm::HS256), &repr, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> AuthResult<Claims> {
        self.decode_at(token, Utc::now())
    }

    /// Signature first, then claim parsing, then expiry against `now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let data = decode::<ClaimsRepr>(token, &self.decoding, &self.validation)?;
        let claims = Claims::try_from(data.claims)?;
        if claims.is_expired_at(now, self.leeway) {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}
