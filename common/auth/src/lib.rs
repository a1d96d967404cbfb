pub mod bearer;
pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod revocation;
pub mod roles;
pub mod verifier;

pub use bearer::{bearer_token, parse_bearer};
pub use claims::{Claims, TokenKind};
pub use codec::TokenCodec;
pub use config::{JwtConfig, SigningSecret};
pub use error::{AuthError, AuthResult};
pub use revocation::{InMemoryRevocationList, RevocationList};
pub use roles::{ROLE_ADMIN, ROLE_MANAGER, ROLE_USER};
pub use verifier::JwtVerifier;

use std::sync::Arc;

use tracing::{debug, warn};

/// Build the verifier every service uses from the shared configuration.
///
/// The revocation list is injected so that the issuer and every verifier
/// can consult the same store. Passing `None` while revocation is enabled
/// leaves revoked tokens valid in this process until they expire.
pub fn verifier_from_config(
    config: &JwtConfig,
    revocations: Option<Arc<dyn RevocationList>>,
) -> JwtVerifier {
    let verifier = JwtVerifier::new(Arc::new(TokenCodec::from_config(config)));
    match (config.revocation_enabled, revocations) {
        (true, Some(list)) => verifier.with_revocation_list(list),
        (true, None) => {
            warn!(
                "revocation enabled without a shared revocation list; \
                 revoked tokens stay valid until expiry"
            );
            verifier
        }
        (false, Some(_)) => {
            debug!("revocation disabled; ignoring the supplied revocation list");
            verifier
        }
        (false, None) => verifier,
    }
}
