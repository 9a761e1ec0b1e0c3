//! In-memory lock table using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use boleteria_core::result::AppResult;
use boleteria_core::types::{FunctionId, ResourceKey, SessionId};
use boleteria_entity::lock::{LockChange, LockClaim, LockStatus, SeatLock};

use crate::lock_table::{LockTable, ReleaseOutcome, UpsertOutcome};

/// Feed buffer per function. A slow consumer past this point observes a
/// lag and must refetch.
const FEED_CAPACITY: usize = 256;

/// Internal state for the memory-based lock table.
#[derive(Debug, Default)]
struct Inner {
    /// Lock rows keyed by `(function, resource)`.
    rows: HashMap<(FunctionId, ResourceKey), SeatLock>,
    /// Change feed senders, one per function.
    feeds: HashMap<FunctionId, broadcast::Sender<LockChange>>,
}

impl Inner {
    fn feed(&mut self, function_id: FunctionId) -> &broadcast::Sender<LockChange> {
        self.feeds
            .entry(function_id)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
    }

    fn emit(&mut self, function_id: FunctionId, change: LockChange) {
        if let Some(sender) = self.feeds.get(&function_id) {
            // No receivers is fine; the feed is fire-and-forget.
            let _ = sender.send(change);
        }
    }
}

/// In-memory lock table with check-and-set semantics under one
/// `tokio::sync::Mutex`.
///
/// Every mutation and its feed emission happen under the same lock, so
/// observers see changes in table order. Suitable for tests and
/// single-node deployments only.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockTable {
    /// Protected inner state.
    state: Arc<Mutex<Inner>>,
}

impl MemoryLockTable {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored, expired ones included.
    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }
}

#[async_trait]
impl LockTable for MemoryLockTable {
    async fn upsert(&self, claim: &LockClaim) -> AppResult<UpsertOutcome> {
        let mut state = self.state.lock().await;
        let key = (claim.function_id, claim.resource.clone());

        let existing = state.rows.get(&key).cloned();
        match existing {
            Some(row) if row.is_terminal() => Ok(UpsertOutcome::Conflict {
                holder: Some(row.session_id),
            }),
            Some(row) if row.is_held_by(&claim.session_id) => {
                // Extend: the deadline and status refresh, the original
                // locked_at survives.
                let mut updated = claim.clone().into_row();
                updated.locked_at = row.locked_at;
                state.rows.insert(key, updated.clone());
                state.emit(claim.function_id, LockChange::Updated(updated.clone()));
                Ok(UpsertOutcome::Extended(updated))
            }
            Some(row) if row.is_expired(claim.locked_at) => {
                // The previous claim lapsed; the row is taken over whole.
                let updated = claim.clone().into_row();
                state.rows.insert(key, updated.clone());
                state.emit(claim.function_id, LockChange::Updated(updated.clone()));
                debug!(
                    resource = %claim.resource,
                    previous_holder = %row.session_id,
                    "Expired lock taken over"
                );
                Ok(UpsertOutcome::Created(updated))
            }
            Some(row) => Ok(UpsertOutcome::Conflict {
                holder: Some(row.session_id),
            }),
            None => {
                let created = claim.clone().into_row();
                state.rows.insert(key, created.clone());
                state.emit(claim.function_id, LockChange::Inserted(created.clone()));
                Ok(UpsertOutcome::Created(created))
            }
        }
    }

    async fn delete(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<ReleaseOutcome> {
        let mut state = self.state.lock().await;
        let key = (function_id, resource.clone());

        match state.rows.get(&key).cloned() {
            None => Ok(ReleaseOutcome::NotHeld),
            // The terminal check wins over the ownership check.
            Some(row) if row.is_terminal() => Ok(ReleaseOutcome::Refused { status: row.status }),
            Some(row) if !row.is_held_by(session_id) => Ok(ReleaseOutcome::NotHeld),
            Some(row) => {
                state.rows.remove(&key);
                state.emit(function_id, LockChange::Deleted(row.clone()));
                Ok(ReleaseOutcome::Released(row))
            }
        }
    }

    async fn delete_all_for_session(
        &self,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;

        let doomed: Vec<(FunctionId, ResourceKey)> = state
            .rows
            .iter()
            .filter(|((function, _), row)| {
                *function == function_id && row.is_held_by(session_id) && !row.is_terminal()
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0u64;
        for key in doomed {
            if let Some(row) = state.rows.remove(&key) {
                state.emit(function_id, LockChange::Deleted(row));
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn find(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
    ) -> AppResult<Option<SeatLock>> {
        let state = self.state.lock().await;
        Ok(state.rows.get(&(function_id, resource.clone())).cloned())
    }

    async fn list_live(
        &self,
        function_id: FunctionId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SeatLock>> {
        let state = self.state.lock().await;
        let mut live: Vec<SeatLock> = state
            .rows
            .iter()
            .filter(|((function, _), row)| *function == function_id && row.is_live(now))
            .map(|(_, row)| row.clone())
            .collect();
        live.sort_by_key(|row| row.locked_at);
        Ok(live)
    }

    async fn mark_expiring(&self, now: DateTime<Utc>, threshold: Duration) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let cutoff = now + threshold;

        let near: Vec<(FunctionId, ResourceKey)> = state
            .rows
            .iter()
            .filter(|(_, row)| {
                row.status == LockStatus::Selected
                    && row.expires_at > now
                    && row.expires_at <= cutoff
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut flagged = 0u64;
        for key in near {
            let function_id = key.0;
            if let Some(row) = state.rows.get_mut(&key) {
                row.status = LockStatus::Expiring;
                let updated = row.clone();
                state.emit(function_id, LockChange::Updated(updated));
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;

        let doomed: Vec<(FunctionId, ResourceKey)> = state
            .rows
            .iter()
            .filter(|(_, row)| !row.is_terminal() && row.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0u64;
        for key in doomed {
            let function_id = key.0;
            if let Some(row) = state.rows.remove(&key) {
                state.emit(function_id, LockChange::Deleted(row));
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn watch(&self, function_id: FunctionId) -> AppResult<broadcast::Receiver<LockChange>> {
        let mut state = self.state.lock().await;
        Ok(state.feed(function_id).subscribe())
    }
}
