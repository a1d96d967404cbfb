use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_http_errors::{labels, ApiError};
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

use crate::claims::TokenKind;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token kind '{0}' is not accepted here")]
    WrongTokenKind(TokenKind),
    #[error("token has been revoked")]
    Revoked,
    #[error("signing secret must be at least {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },
    #[error("invalid configuration for '{0}': {1}")]
    Config(&'static str, String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable label written to the error envelope.
    pub fn label(&self) -> &'static str {
        match self {
            AuthError::Malformed => labels::MALFORMED_TOKEN,
            AuthError::InvalidSignature => labels::INVALID_SIGNATURE,
            AuthError::Expired => labels::TOKEN_EXPIRED,
            AuthError::WrongTokenKind(_) => labels::WRONG_TOKEN_KIND,
            AuthError::Revoked => labels::TOKEN_REVOKED,
            AuthError::WeakSecret { .. } | AuthError::Config(..) | AuthError::Signing(_) => {
                labels::INTERNAL_ERROR
            }
        }
    }

    /// Client-facing envelope. Messages are fixed so no token content leaks.
    pub fn to_api_error(&self) -> ApiError {
        let message = match self {
            AuthError::Malformed => "The bearer token is malformed",
            AuthError::InvalidSignature => "The bearer token signature could not be verified",
            AuthError::Expired => "The token has expired",
            AuthError::WrongTokenKind(_) => {
                "The presented token kind is not accepted for this request"
            }
            AuthError::Revoked => "The token has been revoked",
            AuthError::WeakSecret { .. } | AuthError::Config(..) | AuthError::Signing(_) => {
                return ApiError::internal();
            }
        };
        ApiError::new(StatusCode::UNAUTHORIZED, self.label(), message)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Malformed,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}
