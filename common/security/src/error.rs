use axum::response::{IntoResponse, Response};
use common_auth::AuthError;
use common_http_errors::ApiError;
use thiserror::Error;

use crate::roles::Role;

/// Terminal outcome of the authenticate/authorize stages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error(transparent)]
    Authentication(#[from] AuthError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing required role")]
    InsufficientRole { required: Vec<Role> },
}

impl SecurityError {
    pub fn label(&self) -> &'static str {
        self.to_api_error().error()
    }

    pub fn to_api_error(&self) -> ApiError {
        match self {
            SecurityError::Authentication(err) => err.to_api_error(),
            SecurityError::Unauthenticated => ApiError::unauthenticated(),
            SecurityError::InsufficientRole { .. } => ApiError::insufficient_role(),
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}
