use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use rand_core::OsRng;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Identity record as the issuer sees it. Read-only to the token core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub secret_hash: String,
    pub roles: BTreeSet<String>,
    pub active: bool,
}

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Lookup contract consumed by the token issuer. Implementations must not retry internally.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Credential>, CredentialStoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, CredentialStoreError>;
}

/// "Verify secret" contract. Comparisons must be constant-time.
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, secret: &str, hash: &str) -> bool;
    /// Spend the same work as a real verification when no credential exists.
    fn verify_dummy(&self, secret: &str);
}

/// Argon2id hashing; PHC strings carry their own parameters, so verification
/// honours whatever cost the stored hash was created with.
pub struct Argon2Secrets {
    argon: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2Secrets {
    pub fn new() -> Result<Self, password_hash::Error> {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Result<Self, password_hash::Error> {
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon
            .hash_password(Uuid::new_v4().as_bytes(), &salt)?
            .to_string();
        Ok(Self { argon, dummy_hash })
    }

    pub fn hash(&self, secret: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self.argon.hash_password(secret.as_bytes(), &salt)?.to_string())
    }
}

impl SecretVerifier for Argon2Secrets {
    fn verify(&self, secret: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    fn verify_dummy(&self, secret: &str) {
        let _ = self.verify(secret, &self.dummy_hash);
    }
}

/// Map-backed store used by tests and local seeding.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<HashMap<Uuid, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: Credential) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(credential.id, credential);
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(&id) {
            Some(credential) => {
                credential.active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_roles<I, R>(&self, id: Uuid, roles: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(&id) {
            Some(credential) => {
                credential.roles = roles.into_iter().map(Into::into).collect();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<Credential> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&id)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Credential>, CredentialStoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.values().find(|c| c.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, CredentialStoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(&id).cloned())
    }
}

#[derive(FromRow)]
struct CredentialRow {
    id: Uuid,
    username: String,
    password_hash: String,
    roles: Vec<String>,
    is_active: bool,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            secret_hash: row.password_hash,
            roles: row.roles.into_iter().collect(),
            active: row.is_active,
        }
    }
}

/// Postgres-backed store over the `credentials` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Credential>, CredentialStoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, password_hash, roles, is_active \
             FROM credentials WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Credential::from))
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, CredentialStoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, password_hash, roles, is_active FROM credentials WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Credential::from))
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Secrets {
        Argon2Secrets::with_params(Params::new(256, 1, 1, None).unwrap()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let secrets = cheap();
        let hash = secrets.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(secrets.verify("correct horse", &hash));
        assert!(!secrets.verify("battery staple", &hash));
    }

    #[test]
    fn plaintext_stored_value_never_verifies() {
        let secrets = cheap();
        assert!(!secrets.verify("hunter2", "hunter2"));
    }

    #[tokio::test]
    async fn in_memory_lookups() {
        let store = InMemoryCredentialStore::new();
        let id = Uuid::new_v4();
        store.insert(Credential {
            id,
            username: "clerk".into(),
            secret_hash: "x".into(),
            roles: BTreeSet::from(["USER".to_string()]),
            active: true,
        });
        assert_eq!(store.find_by_username("clerk").await.unwrap().unwrap().id, id);
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.set_active(id, false));
        assert!(!store.find_by_id(id).await.unwrap().unwrap().active);
    }
}
