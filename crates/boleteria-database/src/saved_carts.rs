//! Saved-cart store trait.

use async_trait::async_trait;

use boleteria_core::result::AppResult;
use boleteria_core::types::{SavedCartId, SessionId};
use boleteria_entity::cart::{CreateSavedCart, SavedCart};

/// Durable storage for named cart snapshots, scoped per session.
#[async_trait]
pub trait SavedCartStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persists a new saved cart and returns it with its identity.
    async fn create(&self, data: CreateSavedCart) -> AppResult<SavedCart>;

    /// Fetches one saved cart, provided it belongs to the session.
    async fn find(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<Option<SavedCart>>;

    /// Lists the session's saved carts, newest first.
    async fn list(&self, session_id: &SessionId) -> AppResult<Vec<SavedCart>>;

    /// Deletes one saved cart scoped to the session. Returns whether a
    /// row was removed.
    async fn delete(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<bool>;
}
