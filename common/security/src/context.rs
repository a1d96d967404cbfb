use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use chrono::{DateTime, Utc};
use common_auth::Claims;
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use tracing::Span;
use uuid::Uuid;

use crate::roles::Role;

pub const TRACE_HEADER: &str = "X-Trace-ID";

/// Identity and roles for the lifetime of one request. `subject == None` means anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub subject: Option<Uuid>,
    pub roles: Vec<Role>,
    pub expires_at: Option<DateTime<Utc>>,
    pub trace_id: Option<Uuid>,
}

impl SecurityContext {
    pub fn anonymous(trace_id: Option<Uuid>) -> Self {
        Self { subject: None, roles: Vec::new(), expires_at: None, trace_id }
    }

    pub fn from_claims(claims: &Claims, trace_id: Option<Uuid>) -> Self {
        let mut roles: Vec<Role> = claims.roles.iter().map(|r| Role::parse(r)).collect();
        roles.sort();
        roles.dedup();
        Self {
            subject: Some(claims.subject),
            roles,
            expires_at: Some(claims.expires_at),
            trace_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.roles.iter().any(|r| required.iter().any(|x| x == r))
    }
}

pub fn trace_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers.get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Hands the context established by the security gate to a handler.
pub struct SecurityCtxExtractor(pub SecurityContext);

#[async_trait]
impl<S> FromRequestParts<S> for SecurityCtxExtractor where S: Send + Sync {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A route mounted without the gate has no context; treat it as unauthenticated.
        let ctx = parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated().at(parts.uri.path()))?;

        if let Some(subject) = ctx.subject.as_ref() {
            Span::current().record("subject", tracing::field::display(subject));
        }
        if let Some(tid) = ctx.trace_id.as_ref() {
            Span::current().record("trace_id", tracing::field::display(tid));
        }

        Ok(SecurityCtxExtractor(ctx))
    }
}
