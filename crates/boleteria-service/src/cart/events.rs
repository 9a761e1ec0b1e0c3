//! Cart change notifications and toggle results.

use serde::{Deserialize, Serialize};

use boleteria_core::types::SeatId;

/// Why a seat toggle refused to add the seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The seat carries a `pagado` lock. Sold inventory never re-enters a cart.
    Sold,
    /// Another session holds a live lock on the seat or its table.
    TakenByAnother,
    /// The seat or function id failed validation before any I/O.
    Invalid,
    /// The lock write lost a race or ran out of retries.
    AcquireFailed,
}

/// What a call to [`CartStore::toggle_item`] did.
///
/// [`CartStore::toggle_item`]: crate::cart::CartStore::toggle_item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The seat was locked and appended to the cart.
    Added,
    /// The seat was already in the cart and has been removed.
    Removed,
    /// The seat was refused; the cart is unchanged.
    Rejected(RejectReason),
}

impl ToggleOutcome {
    /// Whether the seat sits in the cart after the toggle.
    pub fn in_cart(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Broadcast to every subscriber whenever the cart changes shape or the
/// countdown moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    /// A seat entered the cart.
    ItemAdded { seat_id: SeatId },
    /// A seat left the cart.
    ItemRemoved { seat_id: SeatId },
    /// A seat toggle was refused.
    SeatRejected { seat_id: SeatId, reason: RejectReason },
    /// The countdown advanced; `seconds_left` is recomputed from the
    /// absolute deadline, so a throttled ticker still reports true time.
    Tick { seconds_left: u64 },
    /// The deadline passed. Emitted exactly once per armed deadline.
    Expired,
    /// The cart was emptied by an explicit clear, not by expiry.
    Cleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = CartEvent::SeatRejected {
            seat_id: SeatId::new("A1"),
            reason: RejectReason::TakenByAnother,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"seat_rejected\""));
        assert!(json.contains("\"reason\":\"taken_by_another\""));
    }

    #[test]
    fn test_toggle_outcome_in_cart() {
        assert!(ToggleOutcome::Added.in_cart());
        assert!(!ToggleOutcome::Removed.in_cart());
        assert!(!ToggleOutcome::Rejected(RejectReason::Sold).in_cart());
    }
}
