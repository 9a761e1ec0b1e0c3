//! Named carts a session can stash and pick up later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boleteria_core::types::{FunctionId, SavedCartId, SessionId};

use super::{CartItem, CartProduct};

/// A cart parked under a user-chosen name.
///
/// Saving does not transfer the seat locks; restoring a saved cart has
/// to win each seat again through the normal acquire path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCart {
    pub id: SavedCartId,
    /// The session that stashed the cart.
    pub session_id: SessionId,
    /// User-facing label ("Cumpleaños de Ana").
    pub name: String,
    pub items: Vec<CartItem>,
    pub products: Vec<CartProduct>,
    /// Grand total at save time.
    pub total: f64,
    pub function_id: Option<FunctionId>,
    pub created_at: DateTime<Utc>,
}

impl SavedCart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.products.is_empty()
    }
}

/// Payload for stashing the current cart under a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSavedCart {
    pub session_id: SessionId,
    pub name: String,
    pub items: Vec<CartItem>,
    pub products: Vec<CartProduct>,
    pub total: f64,
    pub function_id: Option<FunctionId>,
}

impl CreateSavedCart {
    /// Materializes the row with a fresh id and timestamp.
    pub fn into_saved(self, now: DateTime<Utc>) -> SavedCart {
        SavedCart {
            id: SavedCartId::new(),
            session_id: self.session_id,
            name: self.name,
            items: self.items,
            products: self.products,
            total: self.total,
            function_id: self.function_id,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_saved_assigns_identity() {
        let create = CreateSavedCart {
            session_id: SessionId::new("sess-1"),
            name: "Pendiente".to_string(),
            items: Vec::new(),
            products: Vec::new(),
            total: 0.0,
            function_id: None,
        };
        let now = Utc::now();
        let saved = create.into_saved(now);
        assert_eq!(saved.created_at, now);
        assert!(saved.is_empty());

        let other = CreateSavedCart {
            session_id: SessionId::new("sess-1"),
            name: "Pendiente".to_string(),
            items: Vec::new(),
            products: Vec::new(),
            total: 0.0,
            function_id: None,
        }
        .into_saved(now);
        assert_ne!(saved.id, other.id);
    }
}
