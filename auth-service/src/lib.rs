pub mod app;
pub mod config;
pub mod credentials;
pub mod metrics;
pub mod tokens;
pub mod user_handlers;

pub use app::AppState;

use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use common_security::{enforce, AuthorizationPolicy, PolicyError};

use user_handlers::{current_user, login_user, logout_user, refresh_session, render_metrics};

async fn health() -> &'static str {
    "ok"
}

/// Routes behind the security gate. Token exchange endpoints sit outside it so a
/// stale `Authorization` header cannot block a refresh.
pub fn auth_policy() -> Result<AuthorizationPolicy, PolicyError> {
    AuthorizationPolicy::builder()
        .authenticated(Some(Method::GET), "/auth/me")
        .build()
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(current_user))
        .route_layer(from_fn_with_state(state.gate.clone(), enforce));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(render_metrics))
        .route("/auth/login", post(login_user))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout_user))
        .merge(protected)
        .with_state(state)
}
