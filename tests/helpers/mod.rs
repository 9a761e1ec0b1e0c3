//! Shared test helpers for the booking scenario tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use boleteria_core::traits::clock::{Clock, ManualClock};
use boleteria_core::types::FunctionId;
use boleteria_database::memory::{MemoryLockTable, MemorySavedCartStore};
use boleteria_database::{LockTable, SavedCartStore};
use boleteria_entity::cart::CartItem;
use boleteria_service::{BookingContext, CartEvent};

/// The function every scenario books against.
pub const FUNCTION: FunctionId = FunctionId(7);

/// Curtain time all scenario clocks start at.
pub fn opening_night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap()
}

/// One venue's shared backends: the lock table every session writes to,
/// the saved-cart store, and one manual clock driving them all.
///
/// Each call to [`visitor`] wires a fresh [`BookingContext`] over these
/// backends, modelling another browser session booking the same show.
///
/// [`visitor`]: TestVenue::visitor
pub struct TestVenue {
    pub table: Arc<MemoryLockTable>,
    pub saved: Arc<MemorySavedCartStore>,
    pub clock: Arc<ManualClock>,
}

impl TestVenue {
    pub fn new() -> Self {
        Self {
            table: Arc::new(MemoryLockTable::new()),
            saved: Arc::new(MemorySavedCartStore::new()),
            clock: Arc::new(ManualClock::starting_at(opening_night())),
        }
    }

    /// A new visitor session over the shared backends.
    ///
    /// Each visitor keeps its own profile store, so sessions get distinct
    /// anonymous ids just like distinct browsers would.
    pub fn visitor(&self) -> BookingContext {
        BookingContext::builder()
            .table(Arc::clone(&self.table) as Arc<dyn LockTable>)
            .saved_carts(Arc::clone(&self.saved) as Arc<dyn SavedCartStore>)
            .clock(Arc::clone(&self.clock) as Arc<dyn Clock>)
            .build()
    }

    /// Move the shared clock forward for every session at once.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

/// An orchestra seat line item for [`FUNCTION`].
pub fn orchestra_seat(seat: &str, price: f64) -> CartItem {
    CartItem {
        seat_id: seat.into(),
        zone_id: "platea".into(),
        price,
        display_name: format!("Platea {seat}"),
        zone_name: "Platea".to_string(),
        function_id: FUNCTION,
    }
}

/// Next cart event that is not a countdown tick.
///
/// Countdown ticks flow on the same channel as state changes and a paused
/// runtime can queue enough of them to lag the receiver; both are skipped.
pub async fn next_change(rx: &mut broadcast::Receiver<CartEvent>) -> CartEvent {
    loop {
        match rx.recv().await {
            Ok(CartEvent::Tick { .. }) => continue,
            Ok(event) => return event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("cart event channel closed"),
        }
    }
}
