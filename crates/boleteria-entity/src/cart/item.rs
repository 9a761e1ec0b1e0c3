//! A selected seat inside the cart.

use serde::{Deserialize, Serialize};

use boleteria_core::types::{FunctionId, ResourceKey, SeatId, ZoneId};

/// One seat the user has picked, carrying everything the UI needs to
/// render the line without another lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// The seat key the underlying lock is held on.
    pub seat_id: SeatId,
    /// The pricing zone the seat belongs to.
    pub zone_id: ZoneId,
    /// Seat price in the event's currency.
    pub price: f64,
    /// Human-readable seat label ("Fila 3, Asiento 12").
    pub display_name: String,
    /// Human-readable zone label ("Platea").
    pub zone_name: String,
    /// The function this seat was picked for.
    pub function_id: FunctionId,
}

impl CartItem {
    /// The lock-table resource key for this seat.
    pub fn resource(&self) -> ResourceKey {
        ResourceKey::Seat(self.seat_id.clone())
    }
}
