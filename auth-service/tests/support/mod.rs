#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use argon2::Params;
use auth_service::credentials::{Argon2Secrets, Credential, InMemoryCredentialStore};
use auth_service::metrics::AuthMetrics;
use auth_service::tokens::TokenIssuer;
use auth_service::{auth_policy, build_router, AppState};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode};
use axum::Router;
use common_auth::{
    verifier_from_config, InMemoryRevocationList, JwtConfig, RevocationList, SigningSecret,
};
use common_security::SecurityGate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const CLERK_SECRET: &str = "clerk-pass-1";
pub const ADMIN_SECRET: &str = "admin-pass-1";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
    pub config: JwtConfig,
    pub clerk_id: Uuid,
    pub admin_id: Uuid,
}

pub fn cheap_secrets() -> Argon2Secrets {
    Argon2Secrets::with_params(Params::new(256, 1, 1, None).unwrap()).unwrap()
}

pub fn credential(
    secrets: &Argon2Secrets,
    username: &str,
    secret: &str,
    roles: &[&str],
) -> Credential {
    Credential {
        id: Uuid::new_v4(),
        username: username.to_string(),
        secret_hash: secrets.hash(secret).unwrap(),
        roles: roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
        active: true,
    }
}

pub fn test_app(revocation: bool) -> TestApp {
    let config = JwtConfig::new(SigningSecret::new(TEST_SECRET.to_vec()).unwrap())
        .with_revocation(revocation);
    let secrets = cheap_secrets();
    let store = Arc::new(InMemoryCredentialStore::new());

    let clerk = credential(&secrets, "clerk", CLERK_SECRET, &["USER"]);
    let admin = credential(&secrets, "admin", ADMIN_SECRET, &["ADMIN", "USER"]);
    let (clerk_id, admin_id) = (clerk.id, admin.id);
    store.insert(clerk);
    store.insert(admin);

    let revocations: Arc<dyn RevocationList> = Arc::new(InMemoryRevocationList::new());
    let verifier = verifier_from_config(&config, Some(revocations));
    let issuer = TokenIssuer::new(&config, verifier.clone(), store.clone(), Arc::new(secrets));
    let metrics = AuthMetrics::new().unwrap();
    let gate = SecurityGate::new(verifier, auth_policy().unwrap())
        .with_metrics(metrics.service().clone());
    let state = AppState::new(issuer, metrics, gate);

    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        config,
        clerk_id,
        admin_id,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

pub async fn post_json(
    router: &Router,
    path: &str,
    body: Value,
) -> (StatusCode, HeaderMap, Value) {
    let request = Request::post(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn login(router: &Router, username: &str, secret: &str) -> Value {
    let (status, _, body) = post_json(
        router,
        "/auth/login",
        serde_json::json!({ "username": username, "secret": secret }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body
}
