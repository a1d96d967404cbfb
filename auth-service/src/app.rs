use std::sync::Arc;

use axum::extract::FromRef;
use common_security::SecurityGate;

use crate::metrics::AuthMetrics;
use crate::tokens::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub metrics: Arc<AuthMetrics>,
    pub gate: SecurityGate,
}

impl AppState {
    pub fn new(issuer: TokenIssuer, metrics: AuthMetrics, gate: SecurityGate) -> Self {
        Self {
            issuer: Arc::new(issuer),
            metrics: Arc::new(metrics),
            gate,
        }
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }

    pub fn record_refresh_metric(&self, outcome: &str) {
        self.metrics.refresh_attempt(outcome);
    }
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.issuer.clone()
    }
}

impl FromRef<AppState> for Arc<AuthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
