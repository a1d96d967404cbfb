use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Error labels shared by every service. Clients switch on these, so they
/// are part of the wire contract.
pub mod labels {
    pub const INVALID_CREDENTIALS: &str = "InvalidCredentials";
    pub const ACCOUNT_LOCKED: &str = "AccountLocked";
    pub const INVALID_TOKEN: &str = "InvalidToken";
    pub const TOKEN_EXPIRED: &str = "TokenExpired";
    pub const MALFORMED_TOKEN: &str = "MalformedToken";
    pub const INVALID_SIGNATURE: &str = "InvalidSignature";
    pub const WRONG_TOKEN_KIND: &str = "WrongTokenKind";
    pub const TOKEN_REVOKED: &str = "TokenRevoked";
    pub const UNAUTHENTICATED: &str = "Unauthenticated";
    pub const INSUFFICIENT_ROLE: &str = "InsufficientRole";
    pub const BAD_REQUEST: &str = "BadRequest";
    pub const NOT_FOUND: &str = "NotFound";
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// Uniform rejection payload: `{status, error, message, path}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
    path: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self { status, error, message: message.into(), path: None }
    }

    /// Attach the request path the rejection refers to.
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            labels::UNAUTHENTICATED,
            "Authentication is required to access this resource",
        )
    }

    pub fn insufficient_role() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            labels::INSUFFICIENT_ROLE,
            "The authenticated identity lacks a role required by this resource",
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, labels::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, labels::NOT_FOUND, message)
    }

    pub fn service_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            labels::SERVICE_UNAVAILABLE,
            "A required backend is temporarily unavailable",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            labels::INTERNAL_ERROR,
            "An internal error occurred",
        )
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn error(&self) -> &'static str { self.error }
    pub fn message(&self) -> &str { &self.message }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            status: self.status.as_u16(),
            error: self.error.to_string(),
            message: self.message.clone(),
            path: self.path.clone().unwrap_or_default(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.envelope();
        let mut resp = (self.status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(self.error) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
