//! Local mirror of the lock table for one watched function.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use boleteria_core::types::{ResourceKey, SeatId, SessionId, TableId};
use boleteria_entity::lock::{LockChange, LockStatus, SeatLock};

/// How far a mirrored entry has progressed through reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Written locally after a successful table write; the feed echo has
    /// not come back yet.
    Pending,
    /// The authoritative stream has confirmed the entry.
    Confirmed,
    /// The authoritative stream replaced a pending local write with a
    /// row held by someone else.
    Conflicted,
}

/// One mirrored lock row plus its reconciliation tag.
#[derive(Debug, Clone)]
pub struct MirrorEntry {
    pub lock: SeatLock,
    pub sync: SyncState,
}

/// Read-optimized image of the lock table for the watched function.
///
/// Seats and tables live in separate partitions so per-render lookups
/// never scan. Application is last-write-wins per resource key, which
/// makes replaying an already-applied change a no-op.
#[derive(Debug, Default)]
pub struct LockMirror {
    seats: DashMap<SeatId, MirrorEntry>,
    tables: DashMap<TableId, MirrorEntry>,
}

impl LockMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything, both partitions.
    pub fn clear(&self) {
        self.seats.clear();
        self.tables.clear();
    }

    /// Replaces the whole mirror with an authoritative row set.
    ///
    /// Used right after subscribing and whenever the feed lags. Rows
    /// whose authoritative id column is missing are skipped.
    pub fn seed(&self, rows: Vec<SeatLock>) {
        self.clear();
        for lock in rows {
            let Some(resource) = lock.resource() else {
                continue;
            };
            self.insert(
                &resource,
                MirrorEntry {
                    lock,
                    sync: SyncState::Confirmed,
                },
            );
        }
    }

    /// Applies one change from the authoritative stream.
    ///
    /// The caller's own echo confirms; a foreign row that lands on top
    /// of a pending local write marks the entry conflicted. Applying the
    /// same change twice converges to the same state.
    pub fn apply(&self, change: &LockChange, my_session: &SessionId) {
        match change {
            LockChange::Inserted(row) | LockChange::Updated(row) => {
                let Some(resource) = row.resource() else {
                    return;
                };
                let sync = if row.session_id == *my_session {
                    SyncState::Confirmed
                } else {
                    match self.snapshot(&resource) {
                        Some(prior)
                            if prior.sync == SyncState::Pending
                                && prior.lock.session_id == *my_session =>
                        {
                            SyncState::Conflicted
                        }
                        Some(prior)
                            if prior.sync == SyncState::Conflicted
                                && prior.lock.session_id == row.session_id =>
                        {
                            SyncState::Conflicted
                        }
                        _ => SyncState::Confirmed,
                    }
                };
                self.insert(
                    &resource,
                    MirrorEntry {
                        lock: row.clone(),
                        sync,
                    },
                );
            }
            LockChange::Deleted(row) => {
                if let Some(resource) = row.resource() {
                    self.remove(&resource);
                }
            }
        }
    }

    /// Records a lock this session just wrote, ahead of the feed echo.
    pub fn apply_pending(&self, lock: SeatLock) {
        let Some(resource) = lock.resource() else {
            return;
        };
        self.insert(
            &resource,
            MirrorEntry {
                lock,
                sync: SyncState::Pending,
            },
        );
    }

    /// Drops one resource from the mirror.
    pub fn remove(&self, resource: &ResourceKey) {
        match resource {
            ResourceKey::Seat(id) => {
                self.seats.remove(id);
            }
            ResourceKey::Table(id) => {
                self.tables.remove(id);
            }
        }
    }

    /// The live entry for a resource, if any. Expired non-terminal
    /// entries read as absent.
    pub fn live(&self, resource: &ResourceKey, now: DateTime<Utc>) -> Option<MirrorEntry> {
        self.snapshot(resource).filter(|entry| entry.lock.is_live(now))
    }

    /// Whether any session holds the resource as of `now`.
    pub fn is_locked(&self, resource: &ResourceKey, now: DateTime<Utc>) -> bool {
        self.live(resource, now).is_some()
    }

    /// Whether the given session holds the resource as of `now`.
    pub fn is_locked_by(
        &self,
        resource: &ResourceKey,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> bool {
        self.live(resource, now)
            .is_some_and(|entry| entry.lock.is_held_by(session))
    }

    /// The live holder of the resource, if any.
    pub fn holder_of(&self, resource: &ResourceKey, now: DateTime<Utc>) -> Option<SessionId> {
        self.live(resource, now).map(|entry| entry.lock.session_id)
    }

    /// The live status of the resource, if any. Distinguishes sold
    /// (`pagado`) from merely held when a toggle is refused.
    pub fn status_of(&self, resource: &ResourceKey, now: DateTime<Utc>) -> Option<LockStatus> {
        self.live(resource, now).map(|entry| entry.lock.status)
    }

    /// The reconciliation tag of a mirrored resource, if present.
    pub fn sync_of(&self, resource: &ResourceKey) -> Option<SyncState> {
        self.snapshot(resource).map(|entry| entry.sync)
    }

    /// Every live lock the session holds, both granularities.
    pub fn locks_held_by(&self, session: &SessionId, now: DateTime<Utc>) -> Vec<SeatLock> {
        let seats = self
            .seats
            .iter()
            .filter(|entry| entry.lock.is_live(now) && entry.lock.is_held_by(session))
            .map(|entry| entry.lock.clone());
        let tables = self
            .tables
            .iter()
            .filter(|entry| entry.lock.is_live(now) && entry.lock.is_held_by(session))
            .map(|entry| entry.lock.clone());
        seats.chain(tables).collect()
    }

    /// Number of live entries across both partitions.
    pub fn live_count(&self, now: DateTime<Utc>) -> usize {
        let seats = self
            .seats
            .iter()
            .filter(|entry| entry.lock.is_live(now))
            .count();
        let tables = self
            .tables
            .iter()
            .filter(|entry| entry.lock.is_live(now))
            .count();
        seats + tables
    }

    /// Drops expired non-terminal entries that missed their delete echo.
    /// Returns how many went away.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.seats.len() + self.tables.len();
        self.seats.retain(|_, entry| entry.lock.is_live(now));
        self.tables.retain(|_, entry| entry.lock.is_live(now));
        before - (self.seats.len() + self.tables.len())
    }

    fn insert(&self, resource: &ResourceKey, entry: MirrorEntry) {
        match resource {
            ResourceKey::Seat(id) => {
                self.seats.insert(id.clone(), entry);
            }
            ResourceKey::Table(id) => {
                self.tables.insert(id.clone(), entry);
            }
        }
    }

    // Cloned read so no shard guard outlives the call.
    fn snapshot(&self, resource: &ResourceKey) -> Option<MirrorEntry> {
        match resource {
            ResourceKey::Seat(id) => self.seats.get(id).map(|entry| entry.clone()),
            ResourceKey::Table(id) => self.tables.get(id).map(|entry| entry.clone()),
        }
    }
}
