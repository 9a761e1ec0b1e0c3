//! In-memory saved-cart store for tests and single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use boleteria_core::result::AppResult;
use boleteria_core::types::{SavedCartId, SessionId};
use boleteria_entity::cart::{CreateSavedCart, SavedCart};

use crate::saved_carts::SavedCartStore;

/// In-memory saved-cart store backed by a map under a Tokio mutex.
#[derive(Debug, Clone, Default)]
pub struct MemorySavedCartStore {
    carts: Arc<Mutex<HashMap<SavedCartId, SavedCart>>>,
}

impl MemorySavedCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedCartStore for MemorySavedCartStore {
    async fn create(&self, data: CreateSavedCart) -> AppResult<SavedCart> {
        let saved = data.into_saved(Utc::now());
        let mut carts = self.carts.lock().await;
        carts.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn find(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<Option<SavedCart>> {
        let carts = self.carts.lock().await;
        Ok(carts
            .get(&id)
            .filter(|cart| cart.session_id == *session_id)
            .cloned())
    }

    async fn list(&self, session_id: &SessionId) -> AppResult<Vec<SavedCart>> {
        let carts = self.carts.lock().await;
        let mut mine: Vec<SavedCart> = carts
            .values()
            .filter(|cart| cart.session_id == *session_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn delete(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<bool> {
        let mut carts = self.carts.lock().await;
        let owned = carts
            .get(&id)
            .is_some_and(|cart| cart.session_id == *session_id);
        if owned {
            carts.remove(&id);
        }
        Ok(owned)
    }
}
