use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common_http_errors::ApiError;
use common_security::{ensure_role, Role, SecurityCtxExtractor};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_state::ItemStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn list_items(State(items): State<ItemStore>) -> Json<Vec<Item>> {
    let guard = items.read().await;
    let mut listed: Vec<Item> = guard.values().cloned().collect();
    listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
    Json(listed)
}

pub async fn get_item(
    State(items): State<ItemStore>,
    OriginalUri(uri): OriginalUri,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    items
        .read()
        .await
        .get(&item_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Item not found").at(uri.path()))
}

pub async fn create_item(
    State(items): State<ItemStore>,
    SecurityCtxExtractor(sec): SecurityCtxExtractor,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let path = uri.path();
    let Json(new_item) = payload.map_err(|rejection| {
        warn!(%path, error = %rejection.body_text(), "rejected item payload");
        ApiError::bad_request("Request body is missing or malformed").at(path)
    })?;
    let name = new_item.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Item name must not be empty").at(path));
    }
    let created_by = sec.subject.ok_or_else(|| ApiError::unauthenticated().at(path))?;

    let item = Item {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: new_item.description.trim().to_string(),
        created_by,
        created_at: Utc::now(),
    };
    items.write().await.insert(item.id, item.clone());
    info!(item_id = %item.id, %created_by, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_item(
    State(items): State<ItemStore>,
    SecurityCtxExtractor(sec): SecurityCtxExtractor,
    OriginalUri(uri): OriginalUri,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_role(&sec, Role::Admin).map_err(|err| err.to_api_error().at(uri.path()))?;
    match items.write().await.remove(&item_id) {
        Some(_) => {
            info!(%item_id, actor = ?sec.subject, "item deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::not_found("Item not found").at(uri.path())),
    }
}
