use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Optional denylist consulted during verification.
///
/// Entries only need to live until the token's own expiry; after that the
/// codec rejects the token anyway.
pub trait RevocationList: Send + Sync {
    fn revoke(&self, token: &str, expires_at: DateTime<Utc>);
    fn is_revoked(&self, token: &str) -> bool;
}

/// Process-local denylist keyed by the SHA-256 digest of the token.
#[derive(Default)]
pub struct InMemoryRevocationList {
    inner: RwLock<HashMap<Vec<u8>, DateTime<Utc>>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn digest(token: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.finalize().to_vec()
    }
}

impl RevocationList for InMemoryRevocationList {
    fn revoke(&self, token: &str, expires_at: DateTime<Utc>) {
        let now = Utc::now();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|_, exp| *exp > now);
        if expires_at > now {
            guard.insert(Self::digest(token), expires_at);
        }
    }

    fn is_revoked(&self, token: &str) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(&Self::digest(token))
    }
}
