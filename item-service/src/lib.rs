pub mod app_state;
pub mod config;
pub mod item_handlers;

pub use app_state::AppState;

use axum::{
    extract::State,
    http::{header, Method},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use common_http_errors::ApiError;
use common_observability::TEXT_CONTENT_TYPE;
use common_security::{enforce, AuthorizationPolicy, PolicyError, Role};
use tracing::error;

use item_handlers::{create_item, delete_item, get_item, list_items};

pub const SERVICE_NAME: &str = "item-service";

const API_DOCS: &str = "item-service\n\
GET    /items        USER | MANAGER | ADMIN\n\
GET    /items/:id    USER | MANAGER | ADMIN\n\
POST   /items        MANAGER | ADMIN\n\
DELETE /items/:id    ADMIN\n";

async fn health() -> &'static str {
    "ok"
}

async fn docs() -> &'static str {
    API_DOCS
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match state.metrics().render() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            ApiError::internal().at("/metrics").into_response()
        }
    }
}

pub fn item_policy() -> Result<AuthorizationPolicy, PolicyError> {
    AuthorizationPolicy::builder()
        .permit_all(None, "/docs/**")
        .permit_all(Some(Method::GET), "/healthz")
        .permit_all(Some(Method::GET), "/metrics")
        .require_any(Some(Method::GET), "/items/**", [Role::User, Role::Manager, Role::Admin])
        .require_any(Some(Method::POST), "/items", [Role::Manager, Role::Admin])
        .require_any(Some(Method::DELETE), "/items/:id", [Role::Admin])
        .build()
}

/// Every route, public ones included, goes through the gate.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(render_metrics))
        .route("/docs", get(docs))
        .route("/docs/*rest", get(docs))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).delete(delete_item))
        .layer(from_fn_with_state(state.gate.clone(), enforce))
        .with_state(state)
}
