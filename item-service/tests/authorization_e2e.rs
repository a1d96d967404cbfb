//! Login against the auth service, then call the item service with the issued token.

use std::collections::BTreeSet;
use std::sync::Arc;

use argon2::Params;
use auth_service::credentials::{Argon2Secrets, Credential, InMemoryCredentialStore};
use auth_service::metrics::AuthMetrics;
use auth_service::tokens::TokenIssuer;
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use common_auth::{
    verifier_from_config, InMemoryRevocationList, JwtConfig, RevocationList, SigningSecret,
};
use common_observability::ServiceMetrics;
use common_security::SecurityGate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SHARED_SECRET: &str = "base64:c2hhcmVkLXNlY3JldC1mb3ItYm90aC1zZXJ2aWNlcy0wMTIzNDU2Nzg5";

struct Deployment {
    auth: Router,
    items: Router,
    issuer: Arc<TokenIssuer>,
}

fn deploy() -> Deployment {
    deploy_with(None)
}

/// Both services consult `revocations` when one is supplied.
fn deploy_with(revocations: Option<Arc<dyn RevocationList>>) -> Deployment {
    let config = JwtConfig::new(SigningSecret::parse(SHARED_SECRET).unwrap())
        .with_revocation(revocations.is_some());

    let secrets = Argon2Secrets::with_params(Params::new(256, 1, 1, None).unwrap()).unwrap();
    let store = Arc::new(InMemoryCredentialStore::new());
    for (username, roles) in [("clerk", vec!["USER"]), ("boss", vec!["ADMIN", "USER"])] {
        store.insert(Credential {
            id: Uuid::new_v4(),
            username: username.to_string(),
            secret_hash: secrets.hash("pass-123").unwrap(),
            roles: roles.into_iter().map(String::from).collect::<BTreeSet<_>>(),
            active: true,
        });
    }

    let auth_verifier = verifier_from_config(&config, revocations.clone());
    let issuer = TokenIssuer::new(&config, auth_verifier.clone(), store, Arc::new(secrets));
    let auth_metrics = AuthMetrics::new().unwrap();
    let auth_gate = SecurityGate::new(auth_verifier, auth_service::auth_policy().unwrap());
    let auth_state = auth_service::AppState::new(issuer, auth_metrics, auth_gate);

    // The item service builds its own verifier from the same secret.
    let item_metrics = ServiceMetrics::new(item_service::SERVICE_NAME).unwrap();
    let item_verifier = verifier_from_config(&config, revocations);
    let item_gate = SecurityGate::new(item_verifier, item_service::item_policy().unwrap())
        .with_metrics(item_metrics.clone());

    Deployment {
        issuer: auth_state.issuer.clone(),
        auth: auth_service::build_router(auth_state),
        items: item_service::build_router(item_service::AppState::new(item_metrics, item_gate)),
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn login(deployment: &Deployment, username: &str) -> String {
    let request = Request::post("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "username": username, "secret": "pass-123" }).to_string()))
        .unwrap();
    let (status, body) = call(&deployment.auth, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expiresIn"], 86_400);
    body["accessToken"].as_str().unwrap().to_string()
}

fn bearer(method: &str, path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn get_items(deployment: &Deployment, token: &str) -> (StatusCode, Value) {
    call(&deployment.items, bearer("GET", "/items", Some(token))).await
}

#[tokio::test]
async fn user_token_reads_items() {
    let deployment = deploy();
    let token = login(&deployment, "clerk").await;
    let (status, body) = call(&deployment.items, bearer("GET", "/items", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn token_expired_by_one_second_is_rejected() {
    let deployment = deploy();
    let issued_at = Utc::now() - Duration::hours(24) - Duration::seconds(1);
    let issued = deployment.issuer.login_at("clerk", "pass-123", issued_at).await.unwrap();

    let (status, body) = get_items(&deployment, &issued.access_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TokenExpired");
    assert_eq!(body["path"], "/items");
}

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let deployment = deploy();
    let (status, body) = call(&deployment.items, bearer("GET", "/items", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn user_token_cannot_delete() {
    let deployment = deploy();
    let token = login(&deployment, "clerk").await;
    let path = format!("/items/{}", Uuid::new_v4());
    let (status, body) = call(&deployment.items, bearer("DELETE", &path, Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "InsufficientRole");
    assert_eq!(body["status"], 403);
}

#[tokio::test]
async fn admin_token_reaches_delete_handler() {
    let deployment = deploy();
    let token = login(&deployment, "boss").await;
    let path = format!("/items/{}", Uuid::new_v4());
    let (status, body) = call(&deployment.items, bearer("DELETE", &path, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn refreshed_access_token_works_downstream() {
    let deployment = deploy();
    let issued = deployment.issuer.login("clerk", "pass-123").await.unwrap();
    let refreshed = deployment.issuer.refresh(&issued.refresh_token).await.unwrap();

    let (status, _) = get_items(&deployment, &refreshed.access_token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_items(&deployment, &issued.refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "WrongTokenKind");
}

#[tokio::test]
async fn logout_revokes_access_token_downstream_with_shared_list() {
    let shared: Arc<dyn RevocationList> = Arc::new(InMemoryRevocationList::new());
    let deployment = deploy_with(Some(shared));
    let issued = deployment.issuer.login("clerk", "pass-123").await.unwrap();
    let (status, _) = get_items(&deployment, &issued.access_token).await;
    assert_eq!(status, StatusCode::OK);

    let logout = Request::post("/auth/logout")
        .header("content-type", "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", issued.access_token))
        .body(Body::from(json!({ "refreshToken": issued.refresh_token }).to_string()))
        .unwrap();
    let (status, _) = call(&deployment.auth, logout).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get_items(&deployment, &issued.access_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TokenRevoked");
}
