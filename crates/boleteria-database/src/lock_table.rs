//! Lock table trait and shared outcome types.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;

use boleteria_core::result::AppResult;
use boleteria_core::types::{FunctionId, ResourceKey, SessionId};
use boleteria_entity::lock::{LockChange, LockClaim, LockStatus, SeatLock};

/// Outcome of a conditional lock upsert.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    /// No live row stood in the way; a fresh lock was written.
    Created(SeatLock),
    /// The caller already held the lock; the deadline moved forward and
    /// the status reset to `seleccionado`.
    Extended(SeatLock),
    /// A live row belongs to someone else. The holder is reported when
    /// the backend can read it without racing.
    Conflict {
        /// Session currently holding the lock, if known.
        holder: Option<SessionId>,
    },
}

impl UpsertOutcome {
    /// Whether the claim ended up holding the lock.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Extended(_))
    }

    /// The written row, when the claim won.
    pub fn row(&self) -> Option<&SeatLock> {
        match self {
            Self::Created(row) | Self::Extended(row) => Some(row),
            Self::Conflict { .. } => None,
        }
    }
}

/// Outcome of a guarded lock delete.
#[derive(Debug, Clone)]
pub enum ReleaseOutcome {
    /// The caller's row was removed. Carries the row as it stood so the
    /// mirror can be updated without a re-read.
    Released(SeatLock),
    /// No row for this resource/session pair; nothing to do.
    NotHeld,
    /// The row reached a terminal state and must never be deleted here.
    Refused {
        /// The terminal status that blocked the delete.
        status: LockStatus,
    },
}

/// The shared, authoritative seat/table lock table.
///
/// Implementations must make `upsert` atomic with respect to competing
/// claims on the same `(resource, function)` pair: either the claim wins
/// (create or extend) or it observes the live holder, never a torn row.
/// Two implementations are provided:
/// - PostgreSQL (conditional `ON CONFLICT` write, LISTEN/NOTIFY feed)
/// - In-memory (check-and-set under a `tokio::sync::Mutex`, broadcast feed)
#[async_trait]
pub trait LockTable: Send + Sync + std::fmt::Debug + 'static {
    /// Conditionally writes `claim` keyed on `(resource, function_id)`.
    ///
    /// Wins when no row exists, the existing row is held by the claiming
    /// session, or the existing row is non-terminal and expired as of
    /// `claim.locked_at`. Terminal rows always conflict.
    async fn upsert(&self, claim: &LockClaim) -> AppResult<UpsertOutcome>;

    /// Deletes the row for `(resource, function_id)` if `session_id`
    /// holds it and it is not terminal. The terminal check wins over the
    /// ownership check.
    async fn delete(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<ReleaseOutcome>;

    /// Removes every non-terminal row this session holds for the
    /// function. Returns how many rows went away.
    async fn delete_all_for_session(
        &self,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<u64>;

    /// Fetches the row for `(resource, function_id)` regardless of
    /// liveness.
    async fn find(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
    ) -> AppResult<Option<SeatLock>>;

    /// Fetches every row for the function that is live as of `now`
    /// (unexpired or terminal). Used to seed and re-seed mirrors.
    async fn list_live(
        &self,
        function_id: FunctionId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SeatLock>>;

    /// Flags `seleccionado` rows expiring within `threshold` of `now` as
    /// `expirando`. Returns how many rows were flagged.
    async fn mark_expiring(&self, now: DateTime<Utc>, threshold: Duration) -> AppResult<u64>;

    /// Deletes non-terminal rows whose deadline passed as of `now`.
    /// Returns how many rows were deleted.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Opens the change feed for a function. Every mutation of the
    /// function's rows is observed as a [`LockChange`], including the
    /// caller's own writes.
    async fn watch(&self, function_id: FunctionId) -> AppResult<broadcast::Receiver<LockChange>>;
}
