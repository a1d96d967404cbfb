//! Request pipeline: authenticate → authorize → handler.
//!
//! Each stage is a plain function returning `Result`; [`enforce`] composes
//! them and renders the terminal error through the shared error envelope.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_auth::{bearer_token, JwtVerifier};
use common_observability::ServiceMetrics;
use tracing::warn;
use uuid::Uuid;

use crate::context::{trace_id_from_headers, SecurityContext};
use crate::error::SecurityError;
use crate::policy::AuthorizationPolicy;

/// Turns the `Authorization` header into a [`SecurityContext`]. Pure computation, no I/O.
#[derive(Clone)]
pub struct Authenticator {
    verifier: JwtVerifier,
}

impl Authenticator {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self { verifier }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<SecurityContext, SecurityError> {
        let trace_id = trace_id_from_headers(headers).or_else(|| Some(Uuid::new_v4()));
        match bearer_token(headers)? {
            None => Ok(SecurityContext::anonymous(trace_id)),
            Some(token) => {
                let claims = self.verifier.verify_access(&token)?;
                Ok(SecurityContext::from_claims(&claims, trace_id))
            }
        }
    }
}

/// Everything a service needs to guard its routes, shared by all requests.
#[derive(Clone)]
pub struct SecurityGate {
    authenticator: Authenticator,
    policy: Arc<AuthorizationPolicy>,
    metrics: Option<ServiceMetrics>,
}

impl SecurityGate {
    pub fn new(verifier: JwtVerifier, policy: AuthorizationPolicy) -> Self {
        Self {
            authenticator: Authenticator::new(verifier),
            policy: Arc::new(policy),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    pub fn check(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<SecurityContext, SecurityError> {
        let ctx = self.authenticator.authenticate(headers)?;
        self.policy.authorize(method, path, &ctx)?;
        Ok(ctx)
    }

    /// Failure responder: log, count, and render the envelope for `path`.
    pub fn reject(&self, err: &SecurityError, path: &str) -> Response {
        let api_error = err.to_api_error().at(path);
        warn!(
            error = api_error.error(),
            status = api_error.status().as_u16(),
            path,
            "request rejected"
        );
        if let Some(metrics) = &self.metrics {
            metrics.rejection(api_error.error(), api_error.status().as_u16());
        }
        api_error.into_response()
    }
}

/// Axum middleware; mount with `axum::middleware::from_fn_with_state(gate, enforce)`.
pub async fn enforce(
    State(gate): State<SecurityGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match gate.check(request.method(), &path, request.headers()) {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => gate.reject(&err, &path),
    }
}
