use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use auth_service::config::load_service_config;
use auth_service::credentials::{Argon2Secrets, PgCredentialStore};
use auth_service::metrics::{AuthMetrics, SERVICE_NAME};
use auth_service::tokens::TokenIssuer;
use auth_service::{auth_policy, build_router, AppState};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use common_auth::{verifier_from_config, InMemoryRevocationList, RevocationList};
use common_observability::init_tracing;
use common_security::SecurityGate;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(SERVICE_NAME);

    let config = load_service_config()?;

    let db_pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to credential database")?;
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    // One list shared by the issuer and the gate in front of `/auth/me`.
    let revocations = config
        .jwt
        .revocation_enabled
        .then(|| Arc::new(InMemoryRevocationList::new()) as Arc<dyn RevocationList>);
    let verifier = verifier_from_config(&config.jwt, revocations);
    let secrets = Argon2Secrets::new()
        .map_err(|err| anyhow::anyhow!("Failed to prepare hasher: {err}"))?;
    let issuer = TokenIssuer::new(
        &config.jwt,
        verifier.clone(),
        Arc::new(PgCredentialStore::new(db_pool)),
        Arc::new(secrets),
    );

    let metrics = AuthMetrics::new()?;
    let gate = SecurityGate::new(verifier, auth_policy()?).with_metrics(metrics.service().clone());
    let state = AppState::new(issuer, metrics, gate);

    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS_ALLOWED_ORIGINS entry")?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = build_router(state).layer(cors);

    let addr = SocketAddr::from((config.host, config.port));
    info!(%addr, revocation = config.jwt.revocation_enabled, "starting auth-service");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
