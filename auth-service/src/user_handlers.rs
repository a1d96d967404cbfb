use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common_auth::bearer_token;
use common_http_errors::ApiError;
use common_security::{Role, SecurityCtxExtractor};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::tokens::IssueError;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub subject: Uuid,
    pub roles: Vec<Role>,
}

fn bad_body(rejection: JsonRejection, path: &str) -> ApiError {
    warn!(%path, error = %rejection.body_text(), "rejected request body");
    ApiError::bad_request("Request body is missing or malformed").at(path)
}

fn issue_failure(err: &IssueError, path: &str) -> ApiError {
    match err {
        IssueError::CredentialStore(inner) => {
            error!(%path, error = %inner, "credential store unavailable")
        }
        IssueError::Signing(inner) => error!(%path, error = %inner, "token signing failed"),
        other => warn!(%path, error = other.label(), "token issuance rejected"),
    }
    err.to_api_error().at(path)
}

pub async fn login_user(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let path = uri.path();
    let Json(login) = payload.map_err(|rejection| bad_body(rejection, path))?;

    match state.issuer.login(&login.username, &login.secret).await {
        Ok(issued) => {
            state.record_login_metric("success");
            info!(username = %login.username, "login succeeded");
            Ok(Json(LoginResponse {
                access_token: issued.access_token,
                refresh_token: issued.refresh_token,
                token_type: issued.token_type.to_string(),
                expires_in: issued.expires_in,
            }))
        }
        Err(err) => {
            state.record_login_metric(err.label());
            Err(issue_failure(&err, path))
        }
    }
}

pub async fn refresh_session(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let path = uri.path();
    let Json(request) = payload.map_err(|rejection| bad_body(rejection, path))?;

    match state.issuer.refresh(&request.refresh_token).await {
        Ok(refreshed) => {
            state.record_refresh_metric("success");
            Ok(Json(RefreshResponse {
                access_token: refreshed.access_token,
                expires_in: refreshed.expires_in,
            }))
        }
        Err(err) => {
            state.record_refresh_metric(err.label());
            Err(issue_failure(&err, path))
        }
    }
}

/// Revokes the refresh token in the body and the bearer access token, if any.
pub async fn logout_user(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let path = uri.path();
    let Json(request) = payload.map_err(|rejection| bad_body(rejection, path))?;
    let access_token = bearer_token(&headers).ok().flatten();

    let revoked = state
        .issuer
        .logout(&request.refresh_token, access_token.as_deref())
        .map_err(|err| issue_failure(&err, path))?;
    if !revoked {
        info!("logout accepted without revocation list; token stays valid until expiry");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
) -> Result<Json<CurrentUser>, ApiError> {
    let subject = ctx.subject.ok_or_else(ApiError::unauthenticated)?;
    Ok(Json(CurrentUser {
        subject,
        roles: ctx.roles,
    }))
}

pub async fn render_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.metrics.render().map_err(|err| {
        error!(error = %err, "failed to render metrics");
        ApiError::internal()
    })
}
