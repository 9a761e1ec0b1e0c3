//! Seat lock entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use boleteria_core::types::{FunctionId, LockKind, ResourceKey, SeatId, SessionId, TableId};

use crate::lock::status::LockStatus;

/// One row of the shared lock table: a time-bounded claim by one session
/// on one seat or table for one function.
///
/// Exactly one of `seat_id`/`table_id` is set, discriminated by
/// `lock_type`. A non-terminal row whose `expires_at` has passed is
/// logically free even before the reaper removes it; terminal rows stay
/// live regardless of the deadline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeatLock {
    /// The seat under claim, when `lock_type` is `seat`.
    pub seat_id: Option<SeatId>,
    /// The table under claim, when `lock_type` is `table`.
    pub table_id: Option<TableId>,
    /// The function (showing) this claim is scoped to.
    #[serde(rename = "funcion_id")]
    #[sqlx(rename = "funcion_id")]
    pub function_id: FunctionId,
    /// The holder identity.
    pub session_id: SessionId,
    /// Which id column is authoritative.
    pub lock_type: LockKind,
    /// Lifecycle state of the claim.
    pub status: LockStatus,

    // -- Timestamps --
    /// When the claim was first created.
    pub locked_at: DateTime<Utc>,
    /// Absolute deadline; refreshed on every extend.
    pub expires_at: DateTime<Utc>,
}

impl SeatLock {
    /// Reconstruct the resource sum type from the discriminated columns.
    ///
    /// Returns `None` for a corrupt row whose authoritative id column is
    /// missing; readers skip such rows.
    pub fn resource(&self) -> Option<ResourceKey> {
        match self.lock_type {
            LockKind::Seat => self.seat_id.clone().map(ResourceKey::Seat),
            LockKind::Table => self.table_id.clone().map(ResourceKey::Table),
        }
    }

    /// Whether this row belongs to the given session.
    pub fn is_held_by(&self, session: &SessionId) -> bool {
        self.session_id == *session
    }

    /// Whether the release path must refuse to touch this row.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the hold deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the row still blocks other sessions.
    ///
    /// Terminal rows always do; held rows only until their deadline.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_terminal() || !self.is_expired(now)
    }

    /// Time remaining until expiry, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Data required to create or extend a lock row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockClaim {
    /// The resource under claim.
    pub resource: ResourceKey,
    /// The function the claim is scoped to.
    pub function_id: FunctionId,
    /// The claiming session.
    pub session_id: SessionId,
    /// Initial status; `seleccionado` in the normal flow.
    pub status: LockStatus,
    /// Creation timestamp for a fresh row.
    pub locked_at: DateTime<Utc>,
    /// Deadline for the hold.
    pub expires_at: DateTime<Utc>,
}

impl LockClaim {
    /// The seat id column value for this claim.
    pub fn seat_id(&self) -> Option<&SeatId> {
        self.resource.seat_id()
    }

    /// The table id column value for this claim.
    pub fn table_id(&self) -> Option<&TableId> {
        self.resource.table_id()
    }

    /// The lock granularity discriminator.
    pub fn lock_type(&self) -> LockKind {
        self.resource.kind()
    }

    /// Materialize the row this claim would create.
    pub fn into_row(self) -> SeatLock {
        let (seat_id, table_id) = match &self.resource {
            ResourceKey::Seat(id) => (Some(id.clone()), None),
            ResourceKey::Table(id) => (None, Some(id.clone())),
        };
        SeatLock {
            seat_id,
            table_id,
            function_id: self.function_id,
            session_id: self.session_id,
            lock_type: self.resource.kind(),
            status: self.status,
            locked_at: self.locked_at,
            expires_at: self.expires_at,
        }
    }
}
