//! The seat/table lock facade the cart and UI code talk to.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use boleteria_core::config::locks::LocksConfig;
use boleteria_core::error::AppError;
use boleteria_core::result::AppResult;
use boleteria_core::retry::RetryPolicy;
use boleteria_core::traits::clock::Clock;
use boleteria_core::types::{FunctionId, ResourceKey, SeatId, SessionId};
use boleteria_database::{LockTable, ReleaseOutcome, UpsertOutcome};
use boleteria_entity::layout::VenueLayout;
use boleteria_entity::lock::{LockClaim, LockStatus};
use boleteria_realtime::{FunctionSubscription, LockMirror};

use crate::identity::SessionIdentity;

/// Front door for everything lock-shaped.
///
/// Writes go to the lock table with a timeout and transient-error retries;
/// reads come from the in-process mirror and never block. Expected
/// conditions (lost races, validation failures, transport trouble) are
/// reported as `false`/`0` with a structured log line rather than as
/// errors, so callers stay branch-free.
#[derive(Debug)]
pub struct LockStore {
    table: Arc<dyn LockTable>,
    mirror: Arc<LockMirror>,
    identity: Arc<SessionIdentity>,
    clock: Arc<dyn Clock>,
    config: LocksConfig,
    retry: RetryPolicy,
    layout: std::sync::RwLock<Option<VenueLayout>>,
    subscription: tokio::sync::Mutex<Option<FunctionSubscription>>,
}

impl LockStore {
    pub fn new(
        table: Arc<dyn LockTable>,
        mirror: Arc<LockMirror>,
        identity: Arc<SessionIdentity>,
        clock: Arc<dyn Clock>,
        config: LocksConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            table,
            mirror,
            identity,
            clock,
            config,
            retry,
            layout: std::sync::RwLock::new(None),
            subscription: tokio::sync::Mutex::new(None),
        }
    }

    // ──────────────────────────── subscriptions ────────────────────────────

    /// Point the mirror at one function's lock feed.
    ///
    /// Subscribing to the already-active function is a no-op as long as its
    /// dispatcher is still alive. Switching functions tears the previous
    /// subscription down and clears the mirror before the new seed lands, so
    /// no row from the old function ever answers for the new one.
    pub async fn subscribe_to_function(&self, function_id: FunctionId) -> bool {
        if !function_id.is_valid() {
            warn!(function_id = %function_id, "Invalid function id, dropping subscription");
            self.unsubscribe().await;
            return false;
        }

        let mut active = self.subscription.lock().await;
        if let Some(current) = active.as_ref() {
            if current.function_id() == function_id && current.is_running() {
                debug!(function_id = %function_id, "Already subscribed");
                return true;
            }
        }
        if let Some(previous) = active.take() {
            debug!(function_id = %previous.function_id(), "Tearing down previous subscription");
            previous.shutdown().await;
            self.mirror.clear();
        }

        let session = self.identity.resolve().await;
        match FunctionSubscription::open(
            Arc::clone(&self.table),
            Arc::clone(&self.mirror),
            Arc::clone(&self.clock),
            self.retry.clone(),
            session,
            function_id,
        )
        .await
        {
            Ok(subscription) => {
                *active = Some(subscription);
                true
            }
            Err(err) => {
                error!(function_id = %function_id, error = %err, "Lock feed subscription failed");
                false
            }
        }
    }

    /// Stop following the active function and forget everything mirrored.
    pub async fn unsubscribe(&self) {
        let mut active = self.subscription.lock().await;
        if let Some(subscription) = active.take() {
            info!(function_id = %subscription.function_id(), "Unsubscribed from lock feed");
            subscription.shutdown().await;
        }
        // A mirror left populated would keep answering for a feed nobody follows.
        self.mirror.clear();
    }

    /// The function the mirror currently follows, if any.
    pub async fn active_function(&self) -> Option<FunctionId> {
        let active = self.subscription.lock().await;
        active.as_ref().map(|subscription| subscription.function_id())
    }

    // ─────────────────────────────── writes ───────────────────────────────

    /// Claim `resource` for this session with the `seleccionado` status.
    pub async fn acquire(&self, resource: &ResourceKey, function_id: FunctionId) -> bool {
        self.acquire_with_status(resource, function_id, LockStatus::Selected)
            .await
    }

    /// Claim `resource` for this session with an explicit initial status.
    ///
    /// Re-claiming a resource this session already holds extends the hold
    /// and resets its status, which is how the extend sweep pulls a row out
    /// of `expirando`. A live hold by anyone else refuses without touching
    /// the table when the mirror already knows about it.
    pub async fn acquire_with_status(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        status: LockStatus,
    ) -> bool {
        // ── Step 1: validate and normalize before any I/O ──
        if !function_id.is_valid() || resource.is_empty() {
            warn!(resource = %resource, function_id = %function_id, "Acquire rejected, invalid identifiers");
            return false;
        }
        let resource = Self::normalize(resource);
        let session = self.identity.resolve().await;
        let now = self.clock.now();

        // ── Step 2: mirror pre-check, including related table/seat rows ──
        if self.blocked_by_another(&resource, function_id, &session, now) {
            debug!(resource = %resource, function_id = %function_id, "Acquire refused by mirror pre-check");
            return false;
        }

        // ── Step 3: conditional write; the table re-checks under its own lock ──
        let claim = LockClaim {
            resource: resource.clone(),
            function_id,
            session_id: session,
            status,
            locked_at: now,
            expires_at: now + self.config.hold_duration(),
        };
        let outcome = self
            .retry
            .run("lock_acquire", || self.timed(self.table.upsert(&claim)))
            .await;

        // ── Step 4: fold the row into the mirror ahead of the feed echo ──
        match outcome {
            Ok(UpsertOutcome::Created(row)) => {
                debug!(resource = %resource, function_id = %function_id, "Lock acquired");
                self.mirror.apply_pending(row);
                true
            }
            Ok(UpsertOutcome::Extended(row)) => {
                debug!(resource = %resource, function_id = %function_id, "Lock extended");
                self.mirror.apply_pending(row);
                true
            }
            Ok(UpsertOutcome::Conflict { holder }) => {
                debug!(
                    resource = %resource,
                    function_id = %function_id,
                    holder = holder.as_ref().map(SessionId::as_str).unwrap_or("unknown"),
                    "Acquire lost to a live holder"
                );
                false
            }
            Err(err) => {
                warn!(resource = %resource, function_id = %function_id, error = %err, "Acquire failed after retries");
                false
            }
        }
    }

    /// Release this session's hold on `resource`.
    ///
    /// Releasing a resource nobody holds reports success: the desired end
    /// state is already true and retrying would change nothing. Terminal
    /// rows (`reservado`/`pagado`) are refused; another session's live hold
    /// is left intact.
    pub async fn release(&self, resource: &ResourceKey, function_id: FunctionId) -> bool {
        if !function_id.is_valid() || resource.is_empty() {
            warn!(resource = %resource, function_id = %function_id, "Release rejected, invalid identifiers");
            return false;
        }
        let resource = Self::normalize(resource);
        let now = self.clock.now();

        // Sold inventory is never clawed back; skip the round-trip when the
        // mirror already knows the row is terminal.
        if let Some(status) = self.mirror.status_of(&resource, now) {
            if status.is_terminal() {
                warn!(resource = %resource, status = %status, "Release refused, lock is terminal");
                return false;
            }
        }

        let session = self.identity.resolve().await;
        let outcome = self
            .retry
            .run("lock_release", || {
                self.timed(self.table.delete(&resource, function_id, &session))
            })
            .await;

        match outcome {
            Ok(ReleaseOutcome::Released(_)) => {
                self.mirror.remove(&resource);
                debug!(resource = %resource, function_id = %function_id, "Lock released");
                true
            }
            Ok(ReleaseOutcome::NotHeld) => {
                debug!(resource = %resource, function_id = %function_id, "Nothing to release");
                true
            }
            Ok(ReleaseOutcome::Refused { status }) => {
                warn!(resource = %resource, status = %status, "Release refused, lock is terminal");
                false
            }
            Err(err) => {
                warn!(resource = %resource, function_id = %function_id, error = %err, "Release failed after retries");
                false
            }
        }
    }

    /// Release every lock this session holds for `function_id`.
    ///
    /// One statement on the table side; terminal rows survive it. Returns
    /// the number of rows actually deleted.
    pub async fn release_all(&self, function_id: FunctionId) -> u64 {
        if !function_id.is_valid() {
            return 0;
        }
        let session = self.identity.resolve().await;
        let outcome = self
            .retry
            .run("lock_release_all", || {
                self.timed(self.table.delete_all_for_session(function_id, &session))
            })
            .await;

        match outcome {
            Ok(released) => {
                let now = self.clock.now();
                for row in self.mirror.locks_held_by(&session, now) {
                    if row.function_id == function_id && !row.is_terminal() {
                        if let Some(resource) = row.resource() {
                            self.mirror.remove(&resource);
                        }
                    }
                }
                if released > 0 {
                    info!(function_id = %function_id, released, "Released session locks");
                }
                released
            }
            Err(err) => {
                warn!(function_id = %function_id, error = %err, "Release sweep failed");
                0
            }
        }
    }

    /// Re-claim every live lock this session holds for `function_id`,
    /// pushing each hold deadline out by a full hold window.
    pub async fn extend_all(&self, function_id: FunctionId) -> usize {
        if !function_id.is_valid() {
            return 0;
        }
        let session = self.identity.resolve().await;
        let now = self.clock.now();
        let held: Vec<ResourceKey> = self
            .mirror
            .locks_held_by(&session, now)
            .into_iter()
            .filter(|row| row.function_id == function_id && !row.is_terminal())
            .filter_map(|row| row.resource())
            .collect();

        let mut refreshed = 0;
        for resource in held {
            if self.acquire(&resource, function_id).await {
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!(function_id = %function_id, refreshed, "Extend sweep refreshed held locks");
        }
        refreshed
    }

    // ─────────────────────────────── reads ───────────────────────────────

    /// Whether anyone holds a live lock on `resource` or a related row.
    ///
    /// With a layout installed, a locked table answers for each of its
    /// seats and any locked seat answers for its table.
    pub fn is_locked(&self, resource: &ResourceKey) -> bool {
        let resource = Self::normalize(resource);
        let now = self.clock.now();
        if self.mirror.is_locked(&resource, now) {
            return true;
        }
        let layout = self.layout.read().unwrap_or_else(|e| e.into_inner());
        layout.as_ref().is_some_and(|layout| {
            layout
                .related(&resource)
                .iter()
                .any(|related| self.mirror.is_locked(related, now))
        })
    }

    /// Whether this session holds a live lock covering `resource`.
    ///
    /// Uses the cached identity only; before the first [`SessionIdentity::resolve`]
    /// this reports `false`.
    pub fn is_locked_by_me(&self, resource: &ResourceKey) -> bool {
        let Some(session) = self.identity.cached() else {
            return false;
        };
        let resource = Self::normalize(resource);
        let now = self.clock.now();
        if self.mirror.is_locked_by(&resource, &session, now) {
            return true;
        }
        let layout = self.layout.read().unwrap_or_else(|e| e.into_inner());
        layout.as_ref().is_some_and(|layout| {
            layout
                .related(&resource)
                .iter()
                .any(|related| self.mirror.is_locked_by(related, &session, now))
        })
    }

    /// The live status of the lock directly on `resource`, if any.
    pub fn resource_status(&self, resource: &ResourceKey) -> Option<LockStatus> {
        let resource = Self::normalize(resource);
        self.mirror.status_of(&resource, self.clock.now())
    }

    // ─────────────────────────────── layout ───────────────────────────────

    /// Install the seat/table layout used for cross-granularity checks.
    pub fn set_layout(&self, layout: VenueLayout) {
        *self.layout.write().unwrap_or_else(|e| e.into_inner()) = Some(layout);
    }

    /// Drop the layout; checks fall back to direct rows only.
    pub fn clear_layout(&self) {
        *self.layout.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    // ─────────────────────────────── helpers ───────────────────────────────

    /// Seat ids arrive from the map renderer with a `silla_` element prefix;
    /// lock rows store the bare key.
    fn normalize(resource: &ResourceKey) -> ResourceKey {
        match resource {
            ResourceKey::Seat(id) => ResourceKey::Seat(SeatId::from_raw(id.as_str())),
            ResourceKey::Table(id) => ResourceKey::Table(id.clone()),
        }
    }

    /// Every table call runs under the configured deadline; a hung call
    /// surfaces as a transient transport error the retry policy may replay.
    async fn timed<T>(&self, operation: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        match tokio::time::timeout(self.config.op_timeout(), operation).await {
            Ok(result) => result,
            Err(_) => Err(AppError::transport("lock table call exceeded its deadline")),
        }
    }

    /// Whether a live row on `resource` itself or on a related layout row
    /// blocks `session` from claiming it.
    fn blocked_by_another(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> bool {
        if self.entry_blocks(resource, function_id, session, now) {
            return true;
        }
        let layout = self.layout.read().unwrap_or_else(|e| e.into_inner());
        layout.as_ref().is_some_and(|layout| {
            layout
                .related(resource)
                .iter()
                .any(|related| self.entry_blocks(related, function_id, session, now))
        })
    }

    fn entry_blocks(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> bool {
        self.mirror.live(resource, now).is_some_and(|entry| {
            entry.lock.function_id == function_id && !entry.lock.is_held_by(session)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::TimeZone;

    use boleteria_core::config::session::SessionConfig;
    use boleteria_core::traits::auth::AnonymousAuthProvider;
    use boleteria_core::traits::clock::ManualClock;
    use boleteria_core::types::TableId;
    use boleteria_database::memory::{MemoryKvStore, MemoryLockTable};
    use boleteria_entity::lock::SeatLock;

    const FUNCTION: FunctionId = FunctionId(7);

    struct Fixture {
        table: Arc<MemoryLockTable>,
        mirror: Arc<LockMirror>,
        clock: Arc<ManualClock>,
        store: LockStore,
    }

    fn fixture() -> Fixture {
        let table = Arc::new(MemoryLockTable::new());
        fixture_sharing(&table)
    }

    /// A second store over the same table models a second visitor.
    fn fixture_sharing(table: &Arc<MemoryLockTable>) -> Fixture {
        let mirror = Arc::new(LockMirror::new());
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
        ));
        let identity = Arc::new(SessionIdentity::new(
            Arc::new(AnonymousAuthProvider),
            Arc::new(MemoryKvStore::new()),
            SessionConfig::default(),
        ));
        let store = LockStore::new(
            Arc::clone(table) as Arc<dyn LockTable>,
            Arc::clone(&mirror),
            identity,
            Arc::clone(&clock) as Arc<dyn Clock>,
            LocksConfig::default(),
        );
        Fixture {
            table: Arc::clone(table),
            mirror,
            clock,
            store,
        }
    }

    fn seat(raw: &str) -> ResourceKey {
        ResourceKey::seat(raw)
    }

    fn foreign_row(resource: ResourceKey, status: LockStatus, now: DateTime<Utc>) -> SeatLock {
        LockClaim {
            resource,
            function_id: FUNCTION,
            session_id: SessionId::new("somebody-else"),
            status,
            locked_at: now,
            expires_at: now + chrono::Duration::minutes(10),
        }
        .into_row()
    }

    #[tokio::test]
    async fn test_acquire_and_release_round_trip() {
        let f = fixture();
        assert!(f.store.acquire(&seat("A1"), FUNCTION).await);
        assert!(f.store.is_locked(&seat("A1")));
        assert!(f.store.is_locked_by_me(&seat("A1")));
        assert_eq!(f.table.row_count().await, 1);

        assert!(f.store.release(&seat("A1"), FUNCTION).await);
        assert!(!f.store.is_locked(&seat("A1")));
        assert_eq!(f.table.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_acquire_refuses_invalid_input() {
        let f = fixture();
        assert!(!f.store.acquire(&seat("A1"), FunctionId(0)).await);
        assert!(!f.store.acquire(&seat("   "), FUNCTION).await);
        assert_eq!(f.table.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_seat_prefix_is_normalized() {
        let f = fixture();
        assert!(f.store.acquire(&seat("silla_B4"), FUNCTION).await);
        // Both spellings answer for the same row.
        assert!(f.store.is_locked(&seat("B4")));
        assert!(f.store.is_locked_by_me(&seat("silla_B4")));
        assert_eq!(
            f.table
                .find(&seat("B4"), FUNCTION)
                .await
                .unwrap()
                .map(|row| row.seat_id.unwrap().into_inner()),
            Some("B4".to_owned())
        );
    }

    #[tokio::test]
    async fn test_contention_between_two_sessions() {
        let table = Arc::new(MemoryLockTable::new());
        let alice = fixture_sharing(&table);
        let bravo = fixture_sharing(&table);

        assert!(alice.store.acquire(&seat("C2"), FUNCTION).await);
        // Bravo's mirror is empty, so the refusal comes from the table itself.
        assert!(!bravo.store.acquire(&seat("C2"), FUNCTION).await);
        assert_eq!(table.row_count().await, 1);

        // Bravo cannot release Alice's hold either; the row stays.
        assert!(bravo.store.release(&seat("C2"), FUNCTION).await);
        assert!(table.find(&seat("C2"), FUNCTION).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reacquire_extends_own_hold() {
        let f = fixture();
        assert!(f.store.acquire(&seat("D1"), FUNCTION).await);
        let first = f
            .table
            .find(&seat("D1"), FUNCTION)
            .await
            .unwrap()
            .unwrap()
            .expires_at;

        f.clock.advance(chrono::Duration::minutes(5));
        assert!(f.store.acquire(&seat("D1"), FUNCTION).await);

        let row = f.table.find(&seat("D1"), FUNCTION).await.unwrap().unwrap();
        assert!(row.expires_at > first);
        assert_eq!(row.status, LockStatus::Selected);
        assert_eq!(f.table.row_count().await, 1);
    }

    #[tokio::test]
    async fn test_mirror_precheck_short_circuits() {
        let f = fixture();
        let now = f.clock.now();
        f.mirror
            .seed(vec![foreign_row(seat("E5"), LockStatus::Selected, now)]);

        assert!(!f.store.acquire(&seat("E5"), FUNCTION).await);
        // The refusal never reached the table.
        assert_eq!(f.table.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_expired_foreign_row_does_not_block() {
        let f = fixture();
        let now = f.clock.now();
        f.mirror
            .seed(vec![foreign_row(seat("E6"), LockStatus::Selected, now)]);

        f.clock.advance(chrono::Duration::minutes(11));
        assert!(!f.store.is_locked(&seat("E6")));
        assert!(f.store.acquire(&seat("E6"), FUNCTION).await);
    }

    #[tokio::test]
    async fn test_release_refuses_terminal_rows() {
        let f = fixture();
        let now = f.clock.now();
        f.mirror
            .seed(vec![foreign_row(seat("F1"), LockStatus::Paid, now)]);

        assert!(!f.store.release(&seat("F1"), FUNCTION).await);
        // Terminal rows stay visible even past their hold window.
        f.clock.advance(chrono::Duration::hours(2));
        assert!(f.store.is_locked(&seat("F1")));
        assert_eq!(f.store.resource_status(&seat("F1")), Some(LockStatus::Paid));
    }

    #[tokio::test]
    async fn test_release_of_absent_row_is_success() {
        let f = fixture();
        assert!(f.store.release(&seat("G9"), FUNCTION).await);
    }

    #[tokio::test]
    async fn test_layout_blocks_seat_under_locked_table() {
        let f = fixture();
        let mut layout = VenueLayout::new();
        layout.add_table(
            TableId::new("mesa_1"),
            vec![SeatId::new("M1S1"), SeatId::new("M1S2")],
        );
        f.store.set_layout(layout);

        let now = f.clock.now();
        f.mirror.seed(vec![foreign_row(
            ResourceKey::table("mesa_1"),
            LockStatus::Selected,
            now,
        )]);

        assert!(f.store.is_locked(&seat("M1S1")));
        assert!(!f.store.is_locked_by_me(&seat("M1S1")));
        assert!(!f.store.acquire(&seat("M1S1"), FUNCTION).await);
        assert_eq!(f.table.row_count().await, 0);

        // Unrelated seats are unaffected.
        assert!(!f.store.is_locked(&seat("Z9")));
        f.store.clear_layout();
        assert!(!f.store.is_locked(&seat("M1S1")));
    }

    #[tokio::test]
    async fn test_layout_blocks_table_with_locked_seat() {
        let f = fixture();
        let mut layout = VenueLayout::new();
        layout.add_table(TableId::new("mesa_2"), vec![SeatId::new("M2S1")]);
        f.store.set_layout(layout);

        let now = f.clock.now();
        f.mirror
            .seed(vec![foreign_row(seat("M2S1"), LockStatus::Selected, now)]);

        assert!(f.store.is_locked(&ResourceKey::table("mesa_2")));
        assert!(
            !f.store
                .acquire(&ResourceKey::table("mesa_2"), FUNCTION)
                .await
        );
    }

    #[tokio::test]
    async fn test_release_all_clears_own_live_rows() {
        let f = fixture();
        assert!(f.store.acquire(&seat("H1"), FUNCTION).await);
        assert!(f.store.acquire(&seat("H2"), FUNCTION).await);
        assert!(f.store.acquire(&seat("H3"), FunctionId(8)).await);

        assert_eq!(f.store.release_all(FUNCTION).await, 2);
        assert_eq!(f.table.row_count().await, 1);
        assert!(!f.store.is_locked(&seat("H1")));
        assert!(!f.store.is_locked(&seat("H2")));
        // The other function's hold is untouched.
        assert!(f.store.is_locked_by_me(&seat("H3")));
    }

    #[tokio::test]
    async fn test_extend_all_refreshes_every_hold() {
        let f = fixture();
        assert!(f.store.acquire(&seat("J1"), FUNCTION).await);
        assert!(f.store.acquire(&seat("J2"), FUNCTION).await);
        let before = f
            .table
            .find(&seat("J1"), FUNCTION)
            .await
            .unwrap()
            .unwrap()
            .expires_at;

        f.clock.advance(chrono::Duration::minutes(4));
        assert_eq!(f.store.extend_all(FUNCTION).await, 2);

        let after = f
            .table
            .find(&seat("J1"), FUNCTION)
            .await
            .unwrap()
            .unwrap()
            .expires_at;
        assert_eq!(after - before, chrono::Duration::minutes(4));
    }

    #[tokio::test]
    async fn test_subscription_feeds_the_mirror() {
        let table = Arc::new(MemoryLockTable::new());
        let watcher = fixture_sharing(&table);
        let writer = fixture_sharing(&table);

        assert!(watcher.store.subscribe_to_function(FUNCTION).await);
        assert_eq!(watcher.store.active_function().await, Some(FUNCTION));

        assert!(writer.store.acquire(&seat("K1"), FUNCTION).await);

        // The change arrives through the feed, not through watcher's own writes.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !watcher.store.is_locked(&seat("K1")) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "feed change never reached the watcher's mirror"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!watcher.store.is_locked_by_me(&seat("K1")));

        watcher.store.unsubscribe().await;
        assert_eq!(watcher.store.active_function().await, None);
        assert!(!watcher.store.is_locked(&seat("K1")));
    }

    #[tokio::test]
    async fn test_subscribe_to_invalid_function_tears_down() {
        let f = fixture();
        assert!(f.store.subscribe_to_function(FUNCTION).await);
        assert!(!f.store.subscribe_to_function(FunctionId(0)).await);
        assert_eq!(f.store.active_function().await, None);
    }

    #[tokio::test]
    async fn test_switching_functions_clears_the_mirror() {
        let f = fixture();
        assert!(f.store.acquire(&seat("L1"), FUNCTION).await);
        assert!(f.store.subscribe_to_function(FUNCTION).await);
        assert!(f.store.is_locked(&seat("L1")));

        assert!(f.store.subscribe_to_function(FunctionId(8)).await);
        assert_eq!(f.store.active_function().await, Some(FunctionId(8)));
        // Rows from the previous function are gone from the mirror.
        assert!(!f.store.is_locked(&seat("L1")));
    }
}
