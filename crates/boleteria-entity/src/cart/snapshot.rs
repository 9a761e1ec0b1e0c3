//! Persisted image of the cart used for crash/refresh recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boleteria_core::types::FunctionId;

use super::{CartItem, CartProduct};

/// Serializable snapshot of everything the cart holds.
///
/// Written to the key-value store after each mutation and read back on
/// startup. The deadline travels with the data so a restore can decide
/// whether the cart is still worth re-arming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub products: Vec<CartProduct>,
    /// Set while the cart is pinned to one function.
    pub function_id: Option<FunctionId>,
    /// The single shared deadline, absent while the cart is empty.
    pub cart_expiration: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.products.is_empty()
    }

    /// Whether the stored deadline has already passed.
    ///
    /// A snapshot without a deadline never reads as expired; the caller
    /// decides what an armed-but-empty snapshot means.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.cart_expiration {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Seat lines plus product lines.
    pub fn line_count(&self) -> usize {
        self.items.len() + self.products.len()
    }

    /// Grand total across seats and products.
    pub fn total(&self) -> f64 {
        let seats: f64 = self.items.iter().map(|item| item.price).sum();
        let products: f64 = self.products.iter().map(|product| product.total_price).sum();
        seats + products
    }
}

#[cfg(test)]
mod tests {
    use boleteria_core::types::{SeatId, ZoneId};
    use chrono::Duration;

    use super::*;

    fn make_item(seat: &str, price: f64) -> CartItem {
        CartItem {
            seat_id: SeatId::new(seat),
            zone_id: ZoneId::new("general"),
            price,
            display_name: seat.to_string(),
            zone_name: "General".to_string(),
            function_id: FunctionId::new(7),
        }
    }

    #[test]
    fn test_empty_snapshot_never_expired() {
        let snapshot = CartSnapshot::default();
        assert!(snapshot.is_empty());
        assert!(!snapshot.is_expired(Utc::now()));
    }

    #[test]
    fn test_deadline_comparison() {
        let now = Utc::now();
        let snapshot = CartSnapshot {
            items: vec![make_item("A1", 20.0)],
            cart_expiration: Some(now + Duration::minutes(15)),
            function_id: Some(FunctionId::new(7)),
            ..Default::default()
        };
        assert!(!snapshot.is_expired(now));
        assert!(snapshot.is_expired(now + Duration::minutes(15)));
        assert!(snapshot.is_expired(now + Duration::minutes(16)));
    }

    #[test]
    fn test_total_spans_items_and_products() {
        let snapshot = CartSnapshot {
            items: vec![make_item("A1", 20.0), make_item("A2", 25.0)],
            products: vec![CartProduct::new("parking", "Estacionamiento", 5.0, 2)],
            ..Default::default()
        };
        assert_eq!(snapshot.line_count(), 3);
        assert_eq!(snapshot.total(), 55.0);
    }
}
