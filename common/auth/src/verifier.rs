use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::claims::{Claims, TokenKind};
use crate::codec::TokenCodec;
use crate::error::{AuthError, AuthResult};
use crate::revocation::RevocationList;

/// Local, stateless validation of tokens of a given kind.
#[derive(Clone)]
pub struct JwtVerifier {
    codec: Arc<TokenCodec>,
    revocations: Option<Arc<dyn RevocationList>>,
}

impl JwtVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            revocations: None,
        }
    }

    pub fn with_revocation_list(mut self, list: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(list);
        self
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn revocation_enabled(&self) -> bool {
        self.revocations.is_some()
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, TokenKind::Access, Utc::now())
    }

    pub fn verify_refresh(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, TokenKind::Refresh, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> AuthResult<Claims> {
        let claims = self.codec.decode_at(token, now)?;
        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind(claims.kind));
        }
        if let Some(list) = &self.revocations {
            if list.is_revoked(token) {
                return Err(AuthError::Revoked);
            }
        }
        debug!(subject = %claims.subject, kind = %claims.kind, "verified JWT successfully");
        Ok(claims)
    }

    /// Add a verified token to the denylist. Returns `false` when revocation is disabled.
    pub fn revoke(&self, token: &str, claims: &Claims) -> bool {
        match &self.revocations {
            Some(list) => {
                list.revoke(token, claims.expires_at);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use crate::revocation::InMemoryRevocationList;
    use chrono::Duration;
    use uuid::Uuid;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(&SigningSecret::new(vec![9u8; 32]).unwrap(), 0))
    }

    fn access_claims() -> Claims {
        Claims::access(Uuid::new_v4(), ["USER"], Utc::now(), Duration::hours(1)).unwrap()
    }

    #[test]
    fn access_token_verifies_as_access() {
        let verifier = JwtVerifier::new(codec());
        let claims = access_claims();
        let token = verifier.codec().encode(&claims).unwrap();
        assert_eq!(verifier.verify_access(&token).unwrap(), claims);
    }

    #[test]
    fn refresh_token_never_verifies_as_access() {
        let verifier = JwtVerifier::new(codec());
        let claims = Claims::refresh(Uuid::new_v4(), Utc::now(), Duration::days(7)).unwrap();
        let token = verifier.codec().encode(&claims).unwrap();
        assert_eq!(
            verifier.verify_access(&token).unwrap_err(),
            AuthError::WrongTokenKind(TokenKind::Refresh)
        );
        assert!(verifier.verify_refresh(&token).is_ok());
    }

    #[test]
    fn access_token_never_verifies_as_refresh() {
        let verifier = JwtVerifier::new(codec());
        let claims = access_claims();
        let token = verifier.codec().encode(&claims).unwrap();
        assert_eq!(
            verifier.verify_refresh(&token).unwrap_err(),
            AuthError::WrongTokenKind(TokenKind::Access)
        );
    }

    #[test]
    fn revoked_token_is_rejected_when_list_configured() {
        let verifier = JwtVerifier::new(codec())
            .with_revocation_list(Arc::new(InMemoryRevocationList::new()));
        let claims = access_claims();
        let token = verifier.codec().encode(&claims).unwrap();
        assert!(verifier.verify_access(&token).is_ok());
        assert!(verifier.revoke(&token, &claims));
        assert_eq!(verifier.verify_access(&token).unwrap_err(), AuthError::Revoked);
    }

    #[test]
    fn revoke_without_list_is_a_no_op() {
        let verifier = JwtVerifier::new(codec());
        let claims = access_claims();
        let token = verifier.codec().encode(&claims).unwrap();
        assert!(!verifier.revoke(&token, &claims));
        assert!(verifier.verify_access(&token).is_ok());
    }
}
