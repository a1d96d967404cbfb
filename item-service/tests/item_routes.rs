use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use common_auth::{verifier_from_config, Claims, JwtConfig, SigningSecret, TokenCodec};
use common_observability::ServiceMetrics;
use common_security::SecurityGate;
use http_body_util::BodyExt;
use item_service::{build_router, item_policy, AppState, SERVICE_NAME};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct Harness {
    router: Router,
    state: AppState,
    codec: TokenCodec,
}

fn harness() -> Harness {
    let config = JwtConfig::new(SigningSecret::new(vec![42u8; 32]).unwrap());
    let metrics = ServiceMetrics::new(SERVICE_NAME).unwrap();
    let gate = SecurityGate::new(verifier_from_config(&config, None), item_policy().unwrap())
        .with_metrics(metrics.clone());
    let state = AppState::new(metrics, gate);
    Harness {
        router: build_router(state.clone()),
        state,
        codec: TokenCodec::from_config(&config),
    }
}

impl Harness {
    fn token(&self, roles: &[&str]) -> String {
        let roles = roles.iter().copied();
        let claims = Claims::access(Uuid::new_v4(), roles, Utc::now(), Duration::hours(1)).unwrap();
        self.codec.encode(&claims).unwrap()
    }

    async fn call(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }
}

#[tokio::test]
async fn manager_creates_and_user_reads() {
    let h = harness();
    let manager = h.token(&["MANAGER"]);
    let user = h.token(&["USER"]);

    let widget = json!({ "name": " Widget ", "description": "blue" });
    let (status, created) = h.call("POST", "/items", Some(&manager), Some(widget)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Widget");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = h.call("GET", "/items", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, fetched) = h.call("GET", &format!("/items/{id}"), Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn user_cannot_create() {
    let h = harness();
    let user = h.token(&["USER"]);
    let (status, body) = h.call("POST", "/items", Some(&user), Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "InsufficientRole");
    assert_eq!(h.state.item_count().await, 0);
}

#[tokio::test]
async fn admin_deletes_and_missing_item_is_not_found() {
    let h = harness();
    let admin = h.token(&["ADMIN"]);
    let gadget = json!({ "name": "Gadget" });
    let (_, created) = h.call("POST", "/items", Some(&admin), Some(gadget)).await;
    let path = format!("/items/{}", created["id"].as_str().unwrap());

    let (status, _) = h.call("DELETE", &path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = h.call("GET", &path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    assert_eq!(body["path"], path);
}

#[tokio::test]
async fn role_names_are_case_insensitive_and_prefix_tolerant() {
    let h = harness();
    let token = h.token(&["role_manager"]);
    let (status, _) = h.call("POST", "/items", Some(&token), Some(json!({ "name": "Bolt" }))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn empty_name_and_bad_json_are_bad_requests() {
    let h = harness();
    let admin = h.token(&["ADMIN"]);
    let blank = json!({ "name": "  " });
    let (status, body) = h.call("POST", "/items", Some(&admin), Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let wrong_field = json!({ "title": "x" });
    let (status, body) = h.call("POST", "/items", Some(&admin), Some(wrong_field)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["path"], "/items");
}

#[tokio::test]
async fn docs_and_health_are_public() {
    let h = harness();
    let (status, body) = h.call("GET", "/docs/index", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("DELETE /items/:id"));

    let (status, _) = h.call("GET", "/docs", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h.call("GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rejections_show_up_in_metrics() {
    let h = harness();
    h.call("GET", "/items", None, None).await;
    h.call("GET", "/items", None, None).await;
    assert_eq!(h.state.metrics().rejection_count("Unauthenticated", 401), 2);

    let (status, body) = h.call("GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("auth_rejections_total"));
}
