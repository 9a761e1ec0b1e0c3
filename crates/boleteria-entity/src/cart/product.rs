//! Non-seat merchandise lines (parking, drinks, combos).

use serde::{Deserialize, Serialize};

use boleteria_core::types::ProductId;

/// A quantity-bearing product line in the cart.
///
/// Unlike seats, products carry no lock: they never contend with other
/// sessions and expire together with the cart itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    /// Price of a single unit.
    pub unit_price: f64,
    pub quantity: u32,
    /// `unit_price * quantity`, kept denormalized for display.
    pub total_price: f64,
}

impl CartProduct {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: f64,
        quantity: u32,
    ) -> Self {
        let mut product = Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            total_price: 0.0,
        };
        product.recompute_total();
        product
    }

    /// Re-derives `total_price` after a quantity or price change.
    pub fn recompute_total(&mut self) {
        self.total_price = self.unit_price * self.quantity as f64;
    }
}
