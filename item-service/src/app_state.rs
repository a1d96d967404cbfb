use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRef;
use common_observability::ServiceMetrics;
use common_security::SecurityGate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::item_handlers::Item;

pub type ItemStore = Arc<RwLock<HashMap<Uuid, Item>>>;

/// Shared application state used by handlers and the security layer.
#[derive(Clone)]
pub struct AppState {
    pub(crate) items: ItemStore,
    pub(crate) metrics: ServiceMetrics,
    pub(crate) gate: SecurityGate,
}

impl AppState {
    pub fn new(metrics: ServiceMetrics, gate: SecurityGate) -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            metrics,
            gate,
        }
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }
}

impl FromRef<AppState> for ItemStore {
    fn from_ref(state: &AppState) -> Self {
        state.items.clone()
    }
}
