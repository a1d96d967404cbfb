use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use common_auth::{AuthError, Claims, JwtConfig, JwtVerifier, TokenKind};
use common_http_errors::{labels, ApiError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::{Credential, CredentialStore, CredentialStoreError, SecretVerifier};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is locked")]
    AccountLocked,
    #[error("refresh token has expired")]
    TokenExpired,
    #[error("refresh token is invalid")]
    InvalidToken,
    #[error(transparent)]
    CredentialStore(#[from] CredentialStoreError),
    #[error("failed to sign token: {0}")]
    Signing(AuthError),
}

impl IssueError {
    pub fn label(&self) -> &'static str {
        match self {
            IssueError::InvalidCredentials => labels::INVALID_CREDENTIALS,
            IssueError::AccountLocked => labels::ACCOUNT_LOCKED,
            IssueError::TokenExpired => labels::TOKEN_EXPIRED,
            IssueError::InvalidToken => labels::INVALID_TOKEN,
            IssueError::CredentialStore(_) => labels::SERVICE_UNAVAILABLE,
            IssueError::Signing(_) => labels::INTERNAL_ERROR,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        match self {
            IssueError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                labels::INVALID_CREDENTIALS,
                "Invalid credentials. Please try again.",
            ),
            IssueError::AccountLocked => ApiError::new(
                StatusCode::LOCKED,
                labels::ACCOUNT_LOCKED,
                "This account is locked",
            ),
            IssueError::TokenExpired => ApiError::new(
                StatusCode::UNAUTHORIZED,
                labels::TOKEN_EXPIRED,
                "The refresh token has expired",
            ),
            IssueError::InvalidToken => ApiError::new(
                StatusCode::UNAUTHORIZED,
                labels::INVALID_TOKEN,
                "The refresh token is invalid",
            ),
            IssueError::CredentialStore(_) => ApiError::service_unavailable(),
            IssueError::Signing(_) => ApiError::internal(),
        }
    }

    /// Collapse verification failures of a presented refresh token.
    fn from_refresh(err: AuthError) -> Self {
        match err {
            AuthError::Expired => IssueError::TokenExpired,
            AuthError::WeakSecret { .. } | AuthError::Config(..) | AuthError::Signing(_) => {
                IssueError::Signing(err)
            }
            _ => IssueError::InvalidToken,
        }
    }
}

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Exchanges credentials for signed tokens and access tokens for refresh tokens.
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    secrets: Arc<dyn SecretVerifier>,
    verifier: JwtVerifier,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        config: &JwtConfig,
        verifier: JwtVerifier,
        store: Arc<dyn CredentialStore>,
        secrets: Arc<dyn SecretVerifier>,
    ) -> Self {
        Self {
            store,
            secrets,
            verifier,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }

    pub async fn login(&self, username: &str, secret: &str) -> Result<IssuedTokens, IssueError> {
        self.login_at(username, secret, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        username: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokens, IssueError> {
        let Some(credential) = self.store.find_by_username(username).await? else {
            self.secrets.verify_dummy(secret);
            return Err(IssueError::InvalidCredentials);
        };

        if !self.secrets.verify(secret, &credential.secret_hash) {
            return Err(IssueError::InvalidCredentials);
        }
        if !credential.active {
            return Err(IssueError::AccountLocked);
        }

        let access_token = self.mint_access(&credential, now)?;
        let refresh =
            Claims::refresh(credential.id, now, self.refresh_ttl).map_err(IssueError::Signing)?;
        let refresh_token = self
            .verifier
            .codec()
            .encode(&refresh)
            .map_err(IssueError::Signing)?;

        debug!(subject = %credential.id, "issued token pair");
        Ok(IssuedTokens {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, IssueError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    /// Mint a new access token. Roles come from the store, not the old token.
    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshedToken, IssueError> {
        let claims = self
            .verifier
            .verify_at(refresh_token, TokenKind::Refresh, now)
            .map_err(IssueError::from_refresh)?;

        let Some(credential) = self.store.find_by_id(claims.subject).await? else {
            warn!(subject = %claims.subject, "refresh for unknown subject");
            return Err(IssueError::InvalidToken);
        };
        if !credential.active {
            return Err(IssueError::AccountLocked);
        }

        let access_token = self.mint_access(&credential, now)?;
        Ok(RefreshedToken {
            access_token,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Revoke a refresh token and, when presented, the caller's access token.
    ///
    /// An access token belonging to another subject fails the whole logout.
    /// One that no longer verifies is skipped. Returns `false` when
    /// revocation is disabled.
    pub fn logout(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> Result<bool, IssueError> {
        let claims = self
            .verifier
            .verify_refresh(refresh_token)
            .map_err(IssueError::from_refresh)?;

        let access = match access_token.map(|token| (token, self.verifier.verify_access(token))) {
            Some((token, Ok(access))) if access.subject == claims.subject => Some((token, access)),
            Some((_, Ok(access))) => {
                warn!(
                    subject = %claims.subject,
                    other = %access.subject,
                    "logout with foreign access token"
                );
                return Err(IssueError::InvalidToken);
            }
            Some((_, Err(err))) => {
                debug!(error = %err, "access token presented at logout no longer verifies");
                None
            }
            None => None,
        };

        let revoked = self.verifier.revoke(refresh_token, &claims);
        if let Some((token, access)) = access {
            self.verifier.revoke(token, &access);
        }
        Ok(revoked)
    }

    fn mint_access(
        &self,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        let roles = credential.roles.iter().cloned();
        let claims = Claims::access(credential.id, roles, now, self.access_ttl)
            .map_err(IssueError::Signing)?;
        self.verifier
            .codec()
            .encode(&claims)
            .map_err(IssueError::Signing)
    }
}
