//! Venue geometry needed for cross-granularity lock checks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use boleteria_core::types::{ResourceKey, SeatId, TableId};

/// Maps tables to their member seats, with the reverse index kept in
/// step so both directions are O(1).
///
/// A table lock contends with every member seat and a seat lock
/// contends with its owning table; without a layout the two
/// granularities are treated as independent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueLayout {
    tables: HashMap<TableId, Vec<SeatId>>,
    #[serde(skip)]
    seat_to_table: HashMap<SeatId, TableId>,
}

impl VenueLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table and its seats, replacing any previous entry.
    pub fn add_table(&mut self, table_id: TableId, seats: Vec<SeatId>) {
        if let Some(previous) = self.tables.remove(&table_id) {
            for seat in previous {
                self.seat_to_table.remove(&seat);
            }
        }
        for seat in &seats {
            self.seat_to_table.insert(seat.clone(), table_id.clone());
        }
        self.tables.insert(table_id, seats);
    }

    /// The table a seat belongs to, if it is part of one.
    pub fn table_of(&self, seat_id: &SeatId) -> Option<&TableId> {
        self.seat_to_table.get(seat_id)
    }

    /// The member seats of a table. Empty for unknown tables.
    pub fn seats_of(&self, table_id: &TableId) -> &[SeatId] {
        self.tables.get(table_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Every resource whose lock would contend with a lock on `key`.
    ///
    /// For a seat that is the owning table; for a table, each member
    /// seat. The key itself is not included.
    pub fn related(&self, key: &ResourceKey) -> Vec<ResourceKey> {
        match key {
            ResourceKey::Seat(seat_id) => self
                .table_of(seat_id)
                .map(|table_id| vec![ResourceKey::Table(table_id.clone())])
                .unwrap_or_default(),
            ResourceKey::Table(table_id) => self
                .seats_of(table_id)
                .iter()
                .map(|seat_id| ResourceKey::Seat(seat_id.clone()))
                .collect(),
        }
    }

    /// Rebuilds the reverse index, needed after deserializing.
    pub fn reindex(&mut self) {
        self.seat_to_table.clear();
        for (table_id, seats) in &self.tables {
            for seat in seats {
                self.seat_to_table.insert(seat.clone(), table_id.clone());
            }
        }
    }
}
