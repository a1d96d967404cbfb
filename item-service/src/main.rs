use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use common_auth::verifier_from_config;
use common_observability::{init_tracing, ServiceMetrics};
use common_security::SecurityGate;
use item_service::config::load_item_config;
use item_service::{build_router, item_policy, AppState, SERVICE_NAME};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(SERVICE_NAME);

    let config = load_item_config()?;
    let metrics = ServiceMetrics::new(SERVICE_NAME)?;
    // No revocation store is shared with auth-service in this deployment.
    let gate = SecurityGate::new(verifier_from_config(&config.jwt, None), item_policy()?)
        .with_metrics(metrics.clone());
    let state = AppState::new(metrics, gate);

    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS_ALLOWED_ORIGINS entry")?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = build_router(state).layer(cors);

    let addr = SocketAddr::from((config.host, config.port));
    info!(%addr, "starting item-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
