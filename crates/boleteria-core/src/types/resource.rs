//! The contended-resource key: one seat or one whole table.
//!
//! The lock table stores both granularities in one physical table with a
//! `lock_type` discriminator and nullable id columns; at the application
//! boundary the pair is a proper sum type so a lock can never carry both
//! ids or neither.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::id::{SeatId, TableId};

/// Which id field of a lock row is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum LockKind {
    /// A single seat.
    Seat,
    /// A whole table; contends with per-seat locks on its member seats.
    Table,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seat => write!(f, "seat"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Identity of one contended resource within a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceKey {
    /// A per-seat claim.
    Seat(SeatId),
    /// A whole-table claim.
    Table(TableId),
}

impl ResourceKey {
    /// Build a seat resource from any string-like id.
    pub fn seat(id: impl Into<String>) -> Self {
        Self::Seat(SeatId::new(id))
    }

    /// Build a table resource from any string-like id.
    pub fn table(id: impl Into<String>) -> Self {
        Self::Table(TableId::new(id))
    }

    /// The lock granularity this key claims.
    pub fn kind(&self) -> LockKind {
        match self {
            Self::Seat(_) => LockKind::Seat,
            Self::Table(_) => LockKind::Table,
        }
    }

    /// The seat id, when this is a seat key.
    pub fn seat_id(&self) -> Option<&SeatId> {
        match self {
            Self::Seat(id) => Some(id),
            Self::Table(_) => None,
        }
    }

    /// The table id, when this is a table key.
    pub fn table_id(&self) -> Option<&TableId> {
        match self {
            Self::Seat(_) => None,
            Self::Table(id) => Some(id),
        }
    }

    /// The raw id string regardless of granularity.
    pub fn raw_id(&self) -> &str {
        match self {
            Self::Seat(id) => id.as_str(),
            Self::Table(id) => id.as_str(),
        }
    }

    /// Whether the underlying id is empty. Empty keys are rejected before
    /// any lock I/O.
    pub fn is_empty(&self) -> bool {
        self.raw_id().trim().is_empty()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seat(id) => write!(f, "seat {id}"),
            Self::Table(id) => write!(f, "table {id}"),
        }
    }
}

impl From<SeatId> for ResourceKey {
    fn from(id: SeatId) -> Self {
        Self::Seat(id)
    }
}

impl From<TableId> for ResourceKey {
    fn from(id: TableId) -> Self {
        Self::Table(id)
    }
}
