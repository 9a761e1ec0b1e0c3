//! The reservation cart.
//!
//! One cart per session, pinned to one function, with a single absolute
//! deadline shared by everything in it. Seats enter the cart only after
//! their lock is acquired; the cart body is persisted to the profile store
//! after every mutation so a reload can pick it back up.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use boleteria_core::config::cart::CartConfig;
use boleteria_core::error::AppError;
use boleteria_core::result::AppResult;
use boleteria_core::traits::clock::Clock;
use boleteria_core::traits::kv::KeyValueStore;
use boleteria_core::types::{ProductId, SavedCartId};
use boleteria_database::SavedCartStore;
use boleteria_entity::cart::{CartItem, CartProduct, CartSnapshot, CreateSavedCart, SavedCart};
use boleteria_entity::lock::LockStatus;

use crate::cart::events::{CartEvent, RejectReason, ToggleOutcome};
use crate::identity::SessionIdentity;
use crate::locks::LockStore;

const EVENT_CAPACITY: usize = 64;

/// Cart contents plus the countdown that guards them.
#[derive(Debug, Default)]
struct CartState {
    cart: CartSnapshot,
    countdown: Option<Countdown>,
}

#[derive(Debug)]
struct Countdown {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

#[derive(Debug)]
struct CartInner {
    state: Mutex<CartState>,
    locks: Arc<LockStore>,
    identity: Arc<SessionIdentity>,
    saved: Arc<dyn SavedCartStore>,
    profile: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CartConfig,
    events: broadcast::Sender<CartEvent>,
}

/// Shared handle to the session's cart.
///
/// All mutations run under one internal lock, so concurrent toggles are
/// serialized and the deadline, collections, and persisted snapshot never
/// drift apart. Cloning is cheap and every clone sees the same cart.
#[derive(Debug, Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

impl CartStore {
    pub fn new(
        locks: Arc<LockStore>,
        identity: Arc<SessionIdentity>,
        saved: Arc<dyn SavedCartStore>,
        profile: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: CartConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CartInner {
                state: Mutex::new(CartState::default()),
                locks,
                identity,
                saved,
                profile,
                clock,
                config,
                events,
            }),
        }
    }

    /// Listen for cart changes. Slow listeners miss events, not state.
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    // ─────────────────────────────── seats ───────────────────────────────

    /// Add the seat to the cart, or remove it if it is already there.
    ///
    /// Adding locks the seat first and only appends on success; the first
    /// line landing in an empty cart arms a fresh deadline. Removing takes
    /// the seat out of the cart and then releases its lock; a failed
    /// release still removes the seat from view and leaves the row for the
    /// reaper.
    pub async fn toggle_item(&self, seat: CartItem) -> ToggleOutcome {
        let mut state = self.inner.state.lock().await;

        if state
            .cart
            .items
            .iter()
            .any(|existing| existing.seat_id == seat.seat_id)
        {
            return self.remove_seat_locked(&mut state, seat).await;
        }
        self.add_seat_locked(&mut state, seat).await
    }

    async fn remove_seat_locked(&self, state: &mut CartState, seat: CartItem) -> ToggleOutcome {
        state
            .cart
            .items
            .retain(|existing| existing.seat_id != seat.seat_id);
        Self::settle_if_empty(state);

        let released = self
            .inner
            .locks
            .release(&seat.resource(), seat.function_id)
            .await;
        if !released {
            warn!(seat_id = %seat.seat_id, "Seat removed from cart but its lock did not release; the reaper will collect it");
        }

        self.inner.persist(state).await;
        let _ = self.inner.events.send(CartEvent::ItemRemoved {
            seat_id: seat.seat_id,
        });
        ToggleOutcome::Removed
    }

    async fn add_seat_locked(&self, state: &mut CartState, seat: CartItem) -> ToggleOutcome {
        // ── Step 1: cheap refusals before any lock I/O ──
        if !seat.function_id.is_valid() || seat.seat_id.is_empty() {
            return self.reject(seat, RejectReason::Invalid);
        }
        let resource = seat.resource();
        if self.inner.locks.resource_status(&resource) == Some(LockStatus::Paid) {
            return self.reject(seat, RejectReason::Sold);
        }
        if self.inner.locks.is_locked(&resource) && !self.inner.locks.is_locked_by_me(&resource) {
            return self.reject(seat, RejectReason::TakenByAnother);
        }

        // ── Step 2: the lock decides; no lock, no cart entry ──
        if !self.inner.locks.acquire(&resource, seat.function_id).await {
            return self.reject(seat, RejectReason::AcquireFailed);
        }

        // ── Step 3: append, arming the deadline for a previously empty cart ──
        let was_empty = state.cart.is_empty();
        state.cart.function_id = Some(seat.function_id);
        state.cart.items.push(seat.clone());
        if was_empty {
            self.arm_countdown(state);
        }

        self.inner.persist(state).await;
        debug!(seat_id = %seat.seat_id, lines = state.cart.line_count(), "Seat added to cart");
        let _ = self.inner.events.send(CartEvent::ItemAdded {
            seat_id: seat.seat_id,
        });
        ToggleOutcome::Added
    }

    fn reject(&self, seat: CartItem, reason: RejectReason) -> ToggleOutcome {
        debug!(seat_id = %seat.seat_id, ?reason, "Seat refused");
        let _ = self.inner.events.send(CartEvent::SeatRejected {
            seat_id: seat.seat_id,
            reason,
        });
        ToggleOutcome::Rejected(reason)
    }

    // ───────────────────────────── products ─────────────────────────────

    /// Add a product line, merging quantities with an existing line for the
    /// same product. A product landing in an empty cart arms the deadline
    /// just like a first seat would.
    pub async fn add_product(&self, product: CartProduct) {
        let mut state = self.inner.state.lock().await;
        let was_empty = state.cart.is_empty();

        match state
            .cart
            .products
            .iter_mut()
            .find(|line| line.id == product.id)
        {
            Some(line) => {
                line.quantity += product.quantity;
                line.recompute_total();
            }
            None => state.cart.products.push(product),
        }
        if was_empty {
            self.arm_countdown(&mut state);
        }
        self.inner.persist(&state).await;
    }

    /// Set a product line's quantity; zero or less removes the line.
    pub async fn update_product_quantity(&self, product_id: &ProductId, quantity: i64) {
        let mut state = self.inner.state.lock().await;
        if quantity <= 0 {
            state.cart.products.retain(|line| line.id != *product_id);
            Self::settle_if_empty(&mut state);
        } else if let Some(line) = state
            .cart
            .products
            .iter_mut()
            .find(|line| line.id == *product_id)
        {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            line.recompute_total();
        }
        self.inner.persist(&state).await;
    }

    /// Drop a product line entirely.
    pub async fn remove_product(&self, product_id: &ProductId) {
        let mut state = self.inner.state.lock().await;
        state.cart.products.retain(|line| line.id != *product_id);
        Self::settle_if_empty(&mut state);
        self.inner.persist(&state).await;
    }

    // ─────────────────────────── cart lifecycle ───────────────────────────

    /// Empty the cart on purpose.
    ///
    /// `release_locks: false` is for checkout, where the rows must survive
    /// the cart to be promoted to `reservado`/`pagado` downstream.
    pub async fn clear_cart(&self, release_locks: bool) {
        let mut state = self.inner.state.lock().await;
        let items = std::mem::take(&mut state.cart.items);
        let had_lines = !items.is_empty() || !state.cart.products.is_empty();
        state.cart.products.clear();
        Self::disarm(&mut state);

        if release_locks {
            for item in &items {
                let released = self
                    .inner
                    .locks
                    .release(&item.resource(), item.function_id)
                    .await;
                if !released {
                    warn!(seat_id = %item.seat_id, "Seat lock did not release during clear");
                }
            }
        }

        self.inner.persist(&state).await;
        if had_lines {
            info!(released = release_locks, "Cart cleared");
            let _ = self.inner.events.send(CartEvent::Cleared);
        }
    }

    /// Reload the cart persisted by an earlier run.
    ///
    /// A snapshot whose deadline already passed runs the normal expiry path
    /// (locks released, storage emptied, one `Expired` event) without a
    /// countdown ever starting. Returns whether a live cart was installed.
    pub async fn restore(&self) -> bool {
        let raw = match self.inner.profile.get(&self.inner.config.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted cart to restore");
                return false;
            }
            Err(err) => {
                warn!(error = %err, "Persisted cart unreadable");
                return false;
            }
        };
        let snapshot: CartSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Persisted cart corrupt, dropping it");
                let _ = self.inner.profile.remove(&self.inner.config.storage_key).await;
                return false;
            }
        };
        if snapshot.is_empty() {
            return false;
        }

        let expired = snapshot.is_expired(self.inner.clock.now());
        {
            let mut state = self.inner.state.lock().await;
            state.cart = snapshot;
            if !expired {
                self.resume_countdown(&mut state);
            }
        }

        if expired {
            info!("Persisted cart already past its deadline, expiring it");
            self.inner.expire().await;
            return false;
        }

        let seconds_left = self.time_left().await;
        info!(seconds_left, "Persisted cart restored");
        true
    }

    /// Re-claim the lock behind every seat in the cart.
    ///
    /// Seats whose lock is gone to someone else are dropped from the cart
    /// and returned so the caller can tell the visitor which ones were
    /// lost.
    pub async fn reacquire_all(&self) -> Vec<CartItem> {
        let mut state = self.inner.state.lock().await;
        let mut lost = Vec::new();

        for item in state.cart.items.clone() {
            let acquired = self
                .inner
                .locks
                .acquire(&item.resource(), item.function_id)
                .await;
            if !acquired {
                lost.push(item);
            }
        }
        if lost.is_empty() {
            return lost;
        }

        warn!(lost = lost.len(), "Seats lost while the page was hidden");
        state
            .cart
            .items
            .retain(|item| !lost.iter().any(|gone| gone.seat_id == item.seat_id));
        Self::settle_if_empty(&mut state);
        self.inner.persist(&state).await;
        for item in &lost {
            let _ = self.inner.events.send(CartEvent::ItemRemoved {
                seat_id: item.seat_id.clone(),
            });
        }
        lost
    }

    // ───────────────────────────── saved carts ─────────────────────────────

    /// Store the current contents under a name for later.
    ///
    /// Saved carts carry no deadline and hold no locks; loading one back is
    /// what re-enters the locking game.
    pub async fn save_cart(&self, name: &str) -> AppResult<SavedCart> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("saved cart needs a name"));
        }
        let (items, products, total, function_id) = {
            let state = self.inner.state.lock().await;
            if state.cart.is_empty() {
                return Err(AppError::validation("cannot save an empty cart"));
            }
            (
                state.cart.items.clone(),
                state.cart.products.clone(),
                state.cart.total(),
                state.cart.function_id,
            )
        };

        let session_id = self.inner.identity.resolve().await;
        let saved = self
            .inner
            .saved
            .create(CreateSavedCart {
                session_id,
                name: name.to_owned(),
                items,
                products,
                total,
                function_id,
            })
            .await?;
        info!(saved_cart_id = %saved.id, "Cart saved for later");
        Ok(saved)
    }

    /// Replace the cart contents with a previously saved cart.
    ///
    /// Locks are not acquired here; call [`reacquire_all`] afterwards to
    /// find out which of the loaded seats are still available.
    ///
    /// [`reacquire_all`]: Self::reacquire_all
    pub async fn load_saved_cart(&self, id: SavedCartId) -> AppResult<()> {
        let session_id = self.inner.identity.resolve().await;
        let saved = self
            .inner
            .saved
            .find(id.clone(), &session_id)
            .await?
            .ok_or_else(|| AppError::not_found("saved cart not found"))?;

        let mut state = self.inner.state.lock().await;
        let was_empty = state.cart.is_empty();
        state.cart.items = saved.items;
        state.cart.products = saved.products;
        state.cart.function_id = saved.function_id;

        if state.cart.is_empty() {
            Self::settle_if_empty(&mut state);
        } else if was_empty {
            // Loading into an empty cart starts the reservation window anew.
            self.arm_countdown(&mut state);
        }
        self.inner.persist(&state).await;
        info!(saved_cart_id = %id, lines = state.cart.line_count(), "Saved cart loaded");
        Ok(())
    }

    /// Delete a saved cart owned by this session.
    pub async fn delete_saved_cart(&self, id: SavedCartId) -> AppResult<bool> {
        let session_id = self.inner.identity.resolve().await;
        self.inner.saved.delete(id, &session_id).await
    }

    /// This session's saved carts, newest first.
    pub async fn list_saved_carts(&self) -> AppResult<Vec<SavedCart>> {
        let session_id = self.inner.identity.resolve().await;
        self.inner.saved.list(&session_id).await
    }

    // ─────────────────────────────── reads ───────────────────────────────

    /// A copy of the current cart body.
    pub async fn snapshot(&self) -> CartSnapshot {
        self.inner.state.lock().await.cart.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.cart.is_empty()
    }

    /// Seat lines plus product lines.
    pub async fn item_count(&self) -> usize {
        self.inner.state.lock().await.cart.line_count()
    }

    pub async fn seats_total(&self) -> f64 {
        let state = self.inner.state.lock().await;
        state.cart.items.iter().map(|item| item.price).sum()
    }

    pub async fn products_total(&self) -> f64 {
        let state = self.inner.state.lock().await;
        state
            .cart
            .products
            .iter()
            .map(|line| line.total_price)
            .sum()
    }

    pub async fn total(&self) -> f64 {
        self.inner.state.lock().await.cart.total()
    }

    /// Whole seconds until the deadline; zero when nothing is armed.
    pub async fn time_left(&self) -> u64 {
        let state = self.inner.state.lock().await;
        match state.cart.cart_expiration {
            Some(deadline) => (deadline - self.inner.clock.now()).num_seconds().max(0) as u64,
            None => 0,
        }
    }

    // ───────────────────────────── countdown ─────────────────────────────

    /// Set a fresh deadline and start ticking. The deadline is absolute; a
    /// throttled or delayed ticker cannot stretch the reservation window.
    fn arm_countdown(&self, state: &mut CartState) {
        let deadline = self.inner.clock.now() + self.inner.config.expiration_duration();
        state.cart.cart_expiration = Some(deadline);
        self.spawn_ticker(state);
        debug!(%deadline, "Cart deadline armed");
    }

    /// Start ticking against a deadline that is already set, as after a
    /// restore. The remaining window is whatever the deadline says.
    fn resume_countdown(&self, state: &mut CartState) {
        if state.cart.cart_expiration.is_some() {
            self.spawn_ticker(state);
        }
    }

    fn spawn_ticker(&self, state: &mut CartState) {
        if let Some(previous) = state.countdown.take() {
            previous.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(countdown_loop(Arc::clone(&self.inner), cancel.clone()));
        state.countdown = Some(Countdown {
            cancel,
            _task: task,
        });
    }

    fn disarm(state: &mut CartState) {
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel.cancel();
        }
        state.cart.function_id = None;
        state.cart.cart_expiration = None;
    }

    /// An empty cart has no deadline and no pinned function.
    fn settle_if_empty(state: &mut CartState) {
        if state.cart.is_empty() {
            Self::disarm(state);
        }
    }
}

impl CartInner {
    /// Write the cart body to the profile store. Best effort: a failed
    /// write costs reload recovery, not the in-memory cart.
    async fn persist(&self, state: &CartState) {
        match serde_json::to_string(&state.cart) {
            Ok(json) => {
                if let Err(err) = self.profile.put(&self.config.storage_key, &json).await {
                    warn!(error = %err, "Cart snapshot write failed");
                }
            }
            Err(err) => warn!(error = %err, "Cart snapshot serialization failed"),
        }
    }

    /// The deadline passed: clear everything, release the seats, persist
    /// the emptied cart, and say so once.
    ///
    /// Re-checks the deadline under the lock, so a clear or a fresh cart
    /// racing the ticker wins and the expiry becomes a no-op.
    async fn expire(&self) {
        let items = {
            let mut state = self.state.lock().await;
            let now = self.clock.now();
            if !state.cart.is_expired(now) {
                return;
            }
            let items = std::mem::take(&mut state.cart.items);
            state.cart.products.clear();
            CartStore::disarm(&mut state);
            items
        };

        info!(seats = items.len(), "Cart reservation expired");
        for item in &items {
            let released = self.locks.release(&item.resource(), item.function_id).await;
            if !released {
                warn!(seat_id = %item.seat_id, "Expired seat did not release; the reaper will collect it");
            }
        }

        let state = self.state.lock().await;
        self.persist(&state).await;
        drop(state);
        let _ = self.events.send(CartEvent::Expired);
    }
}

/// One second of wall time per tick; each tick recomputes the remaining
/// window from the absolute deadline and fires the expiry when it hits
/// zero.
async fn countdown_loop(inner: Arc<CartInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick resolves immediately; the first report belongs one
    // full interval after arming.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let deadline = {
                    let state = inner.state.lock().await;
                    state.cart.cart_expiration
                };
                // Disarmed under our feet; another ticker owns any new deadline.
                let Some(deadline) = deadline else { break };

                let seconds_left = (deadline - inner.clock.now()).num_seconds();
                if seconds_left <= 0 {
                    inner.expire().await;
                    break;
                }
                let _ = inner.events.send(CartEvent::Tick {
                    seconds_left: seconds_left as u64,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::TimeZone;
    use chrono::Utc;

    use boleteria_core::config::locks::LocksConfig;
    use boleteria_core::config::session::SessionConfig;
    use boleteria_core::traits::auth::AnonymousAuthProvider;
    use boleteria_core::traits::clock::ManualClock;
    use boleteria_core::types::{FunctionId, ResourceKey, SeatId, SessionId, ZoneId};
    use boleteria_database::LockTable;
    use boleteria_database::memory::{MemoryKvStore, MemoryLockTable, MemorySavedCartStore};
    use boleteria_entity::lock::LockClaim;
    use boleteria_realtime::LockMirror;

    const FUNCTION: FunctionId = FunctionId(7);

    struct Fixture {
        table: Arc<MemoryLockTable>,
        mirror: Arc<LockMirror>,
        profile: Arc<MemoryKvStore>,
        clock: Arc<ManualClock>,
        locks: Arc<LockStore>,
        cart: CartStore,
    }

    fn fixture() -> Fixture {
        let table = Arc::new(MemoryLockTable::new());
        fixture_sharing(&table)
    }

    fn fixture_sharing(table: &Arc<MemoryLockTable>) -> Fixture {
        let mirror = Arc::new(LockMirror::new());
        let profile = Arc::new(MemoryKvStore::new());
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
        ));
        let identity = Arc::new(SessionIdentity::new(
            Arc::new(AnonymousAuthProvider),
            Arc::clone(&profile) as Arc<dyn KeyValueStore>,
            SessionConfig::default(),
        ));
        let locks = Arc::new(LockStore::new(
            Arc::clone(table) as Arc<dyn LockTable>,
            Arc::clone(&mirror),
            Arc::clone(&identity),
            Arc::clone(&clock) as Arc<dyn Clock>,
            LocksConfig::default(),
        ));
        let cart = CartStore::new(
            Arc::clone(&locks),
            identity,
            Arc::new(MemorySavedCartStore::new()),
            Arc::clone(&profile) as Arc<dyn KeyValueStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            CartConfig::default(),
        );
        Fixture {
            table: Arc::clone(table),
            mirror,
            profile,
            clock,
            locks,
            cart,
        }
    }

    fn seat_item(seat: &str) -> CartItem {
        CartItem {
            seat_id: SeatId::new(seat),
            zone_id: ZoneId::new("platea"),
            price: 30.0,
            display_name: format!("Platea {seat}"),
            zone_name: "Platea".to_owned(),
            function_id: FUNCTION,
        }
    }

    fn drink(quantity: u32) -> CartProduct {
        CartProduct::new("prod-cola", "Refresco", 3.5, quantity)
    }

    fn foreign_row(
        resource: ResourceKey,
        status: LockStatus,
        now: chrono::DateTime<Utc>,
    ) -> boleteria_entity::lock::SeatLock {
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

    async fn next_event(rx: &mut broadcast::Receiver<CartEvent>) -> CartEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no cart event arrived")
            .expect("cart event channel closed")
    }

    /// Next event that is not a countdown tick.
    async fn next_change(rx: &mut broadcast::Receiver<CartEvent>) -> CartEvent {
        loop {
            let event = next_event(rx).await;
            if !matches!(event, CartEvent::Tick { .. }) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_first_seat_locks_and_arms_deadline() {
        let f = fixture();
        let mut rx = f.cart.subscribe();

        let outcome = f.cart.toggle_item(seat_item("A1")).await;
        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(f.table.row_count().await, 1);
        assert!(f.locks.is_locked_by_me(&ResourceKey::seat("A1")));

        let snapshot = f.cart.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.function_id, Some(FUNCTION));
        let deadline = snapshot.cart_expiration.expect("deadline must be armed");
        assert_eq!(deadline - f.clock.now(), chrono::Duration::minutes(15));
        assert_eq!(f.cart.time_left().await, 15 * 60);

        assert_eq!(
            next_change(&mut rx).await,
            CartEvent::ItemAdded {
                seat_id: SeatId::new("A1")
            }
        );
    }

    #[tokio::test]
    async fn test_later_seats_share_the_deadline() {
        let f = fixture();
        f.cart.toggle_item(seat_item("A1")).await;
        let first = f.cart.snapshot().await.cart_expiration;

        f.clock.advance(chrono::Duration::minutes(3));
        f.cart.toggle_item(seat_item("A2")).await;

        let snapshot = f.cart.snapshot().await;
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.cart_expiration, first);
    }

    #[tokio::test]
    async fn test_toggle_off_releases_and_settles_empty_cart() {
        let f = fixture();
        let mut rx = f.cart.subscribe();

        f.cart.toggle_item(seat_item("A1")).await;
        let outcome = f.cart.toggle_item(seat_item("A1")).await;

        assert_eq!(outcome, ToggleOutcome::Removed);
        assert_eq!(f.table.row_count().await, 0);
        let snapshot = f.cart.snapshot().await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.function_id, None);
        assert_eq!(snapshot.cart_expiration, None);

        assert!(matches!(next_change(&mut rx).await, CartEvent::ItemAdded { .. }));
        assert_eq!(
            next_change(&mut rx).await,
            CartEvent::ItemRemoved {
                seat_id: SeatId::new("A1")
            }
        );
    }

    #[tokio::test]
    async fn test_foreign_hold_rejects_the_seat() {
        let f = fixture();
        let mut rx = f.cart.subscribe();
        f.mirror.seed(vec![foreign_row(
            ResourceKey::seat("B2"),
            LockStatus::Selected,
            f.clock.now(),
        )]);

        let outcome = f.cart.toggle_item(seat_item("B2")).await;
        assert_eq!(
            outcome,
            ToggleOutcome::Rejected(RejectReason::TakenByAnother)
        );
        assert_eq!(f.table.row_count().await, 0);
        assert!(f.cart.is_empty().await);
        assert_eq!(
            next_change(&mut rx).await,
            CartEvent::SeatRejected {
                seat_id: SeatId::new("B2"),
                reason: RejectReason::TakenByAnother
            }
        );
    }

    #[tokio::test]
    async fn test_sold_seat_rejects_the_seat() {
        let f = fixture();
        f.mirror.seed(vec![foreign_row(
            ResourceKey::seat("B3"),
            LockStatus::Paid,
            f.clock.now(),
        )]);

        let outcome = f.cart.toggle_item(seat_item("B3")).await;
        assert_eq!(outcome, ToggleOutcome::Rejected(RejectReason::Sold));
    }

    #[tokio::test]
    async fn test_invalid_seat_rejects_before_io() {
        let f = fixture();
        let mut bad = seat_item("C1");
        bad.function_id = FunctionId(0);

        let outcome = f.cart.toggle_item(bad).await;
        assert_eq!(outcome, ToggleOutcome::Rejected(RejectReason::Invalid));
        assert_eq!(f.table.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_products_merge_and_arm_the_deadline() {
        let f = fixture();
        f.cart.add_product(drink(2)).await;

        let snapshot = f.cart.snapshot().await;
        assert!(snapshot.cart_expiration.is_some());

        f.cart.add_product(drink(3)).await;
        let snapshot = f.cart.snapshot().await;
        assert_eq!(snapshot.products.len(), 1);
        assert_eq!(snapshot.products[0].quantity, 5);
        assert!((snapshot.products[0].total_price - 17.5).abs() < f64::EPSILON);
        assert!((f.cart.total().await - 17.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_product_quantity_update_and_removal() {
        let f = fixture();
        f.cart.add_product(drink(2)).await;

        let id = ProductId::new("prod-cola");
        f.cart.update_product_quantity(&id, 4).await;
        let snapshot = f.cart.snapshot().await;
        assert_eq!(snapshot.products[0].quantity, 4);
        assert!((snapshot.products[0].total_price - 14.0).abs() < f64::EPSILON);

        f.cart.update_product_quantity(&id, 0).await;
        let snapshot = f.cart.snapshot().await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.cart_expiration, None);
    }

    #[tokio::test]
    async fn test_mixed_totals() {
        let f = fixture();
        f.cart.toggle_item(seat_item("A1")).await;
        f.cart.toggle_item(seat_item("A2")).await;
        f.cart.add_product(drink(2)).await;

        assert_eq!(f.cart.item_count().await, 3);
        assert!((f.cart.seats_total().await - 60.0).abs() < f64::EPSILON);
        assert!((f.cart.products_total().await - 7.0).abs() < f64::EPSILON);
        assert!((f.cart.total().await - 67.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clear_cart_releases_and_notifies_once() {
        let f = fixture();
        let mut rx = f.cart.subscribe();
        f.cart.toggle_item(seat_item("A1")).await;
        f.cart.add_product(drink(1)).await;

        f.cart.clear_cart(true).await;
        assert_eq!(f.table.row_count().await, 0);
        assert!(f.cart.is_empty().await);

        // ItemAdded, then Cleared; clearing an already empty cart is silent.
        assert!(matches!(next_change(&mut rx).await, CartEvent::ItemAdded { .. }));
        assert_eq!(next_change(&mut rx).await, CartEvent::Cleared);
        f.cart.clear_cart(true).await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, CartEvent::Cleared));
        }
    }

    #[tokio::test]
    async fn test_clear_cart_can_keep_locks_for_checkout() {
        let f = fixture();
        f.cart.toggle_item(seat_item("A1")).await;

        f.cart.clear_cart(false).await;
        assert!(f.cart.is_empty().await);
        assert_eq!(f.table.row_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_clears_releases_and_notifies_once() {
        let f = fixture();
        let mut rx = f.cart.subscribe();
        f.cart.toggle_item(seat_item("A1")).await;
        f.cart.toggle_item(seat_item("A2")).await;

        f.clock.advance(chrono::Duration::minutes(16));
        loop {
            match next_event(&mut rx).await {
                CartEvent::Expired => break,
                CartEvent::Tick { .. } | CartEvent::ItemAdded { .. } => {}
                other => panic!("unexpected cart event: {other:?}"),
            }
        }

        assert!(f.cart.is_empty().await);
        assert_eq!(f.cart.time_left().await, 0);
        assert_eq!(f.table.row_count().await, 0);

        // The emptied cart is what survives in the profile store.
        let raw = f.profile.get("cart-storage").await.unwrap().unwrap();
        let persisted: CartSnapshot = serde_json::from_str(&raw).unwrap();
        assert!(persisted.is_empty());
        assert_eq!(persisted.cart_expiration, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_report_absolute_remaining_time() {
        let f = fixture();
        let mut rx = f.cart.subscribe();
        f.cart.toggle_item(seat_item("A1")).await;
        assert!(matches!(next_event(&mut rx).await, CartEvent::ItemAdded { .. }));

        // However late the ticker runs, the reported time comes from the
        // deadline, not from counting ticks.
        f.clock.advance(chrono::Duration::minutes(14));
        loop {
            if let CartEvent::Tick { seconds_left } = next_event(&mut rx).await {
                if seconds_left <= 60 {
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_restore_resumes_a_live_cart() {
        let f = fixture();
        let deadline = f.clock.now() + chrono::Duration::minutes(5);
        let snapshot = CartSnapshot {
            items: vec![seat_item("A1")],
            products: vec![drink(1)],
            function_id: Some(FUNCTION),
            cart_expiration: Some(deadline),
        };
        f.profile
            .put("cart-storage", &serde_json::to_string(&snapshot).unwrap())
            .await
            .unwrap();

        assert!(f.cart.restore().await);
        let restored = f.cart.snapshot().await;
        assert_eq!(restored.items.len(), 1);
        assert_eq!(restored.cart_expiration, Some(deadline));
        assert_eq!(f.cart.time_left().await, 5 * 60);
    }

    #[tokio::test]
    async fn test_restore_expires_a_stale_cart() {
        let f = fixture();
        let mut rx = f.cart.subscribe();

        // The previous run held the lock for the persisted seat.
        let session = f.cart.inner.identity.resolve().await;
        let claim = LockClaim {
            resource: ResourceKey::seat("A1"),
            function_id: FUNCTION,
            session_id: session,
            status: LockStatus::Selected,
            locked_at: f.clock.now(),
            expires_at: f.clock.now() + chrono::Duration::minutes(10),
        };
        f.table.upsert(&claim).await.unwrap();

        let snapshot = CartSnapshot {
            items: vec![seat_item("A1")],
            products: Vec::new(),
            function_id: Some(FUNCTION),
            cart_expiration: Some(f.clock.now() - chrono::Duration::minutes(1)),
        };
        f.profile
            .put("cart-storage", &serde_json::to_string(&snapshot).unwrap())
            .await
            .unwrap();

        assert!(!f.cart.restore().await);
        assert!(f.cart.is_empty().await);
        assert_eq!(f.table.row_count().await, 0);
        assert_eq!(next_change(&mut rx).await, CartEvent::Expired);
    }

    #[tokio::test]
    async fn test_restore_drops_corrupt_snapshots() {
        let f = fixture();
        f.profile.put("cart-storage", "not json").await.unwrap();

        assert!(!f.cart.restore().await);
        assert_eq!(f.profile.get("cart-storage").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reacquire_drops_seats_lost_to_another_session() {
        let table = Arc::new(MemoryLockTable::new());
        let mine = fixture_sharing(&table);
        let thief = fixture_sharing(&table);

        mine.cart.toggle_item(seat_item("A1")).await;
        mine.cart.toggle_item(seat_item("A2")).await;

        // The page goes hidden: locks are dropped, then someone else takes A2.
        mine.locks.release_all(FUNCTION).await;
        assert!(thief.locks.acquire(&ResourceKey::seat("A2"), FUNCTION).await);

        let lost = mine.cart.reacquire_all().await;
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].seat_id, SeatId::new("A2"));

        let snapshot = mine.cart.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].seat_id, SeatId::new("A1"));
        assert!(mine.locks.is_locked_by_me(&ResourceKey::seat("A1")));
    }

    #[tokio::test]
    async fn test_saved_cart_round_trip() {
        let f = fixture();
        f.cart.toggle_item(seat_item("A1")).await;
        f.cart.add_product(drink(2)).await;

        let saved = f.cart.save_cart("  Reserva pendiente ").await.unwrap();
        assert_eq!(saved.name, "Reserva pendiente");
        assert!((saved.total - 37.0).abs() < f64::EPSILON);

        f.cart.clear_cart(true).await;
        assert!(f.cart.is_empty().await);

        let listed = f.cart.list_saved_carts().await.unwrap();
        assert_eq!(listed.len(), 1);

        f.cart.load_saved_cart(saved.id.clone()).await.unwrap();
        let snapshot = f.cart.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.products.len(), 1);
        assert_eq!(snapshot.function_id, Some(FUNCTION));
        // Loading starts a fresh reservation window.
        assert_eq!(f.cart.time_left().await, 15 * 60);
        // The locks are not back yet until the caller re-acquires.
        assert_eq!(f.table.row_count().await, 0);
        let lost = f.cart.reacquire_all().await;
        assert!(lost.is_empty());
        assert_eq!(f.table.row_count().await, 1);

        assert!(f.cart.delete_saved_cart(saved.id).await.unwrap());
        assert!(f.cart.list_saved_carts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_refuses_empty_cart_or_blank_name() {
        let f = fixture();
        assert!(f.cart.save_cart("Algo").await.is_err());

        f.cart.add_product(drink(1)).await;
        assert!(f.cart.save_cart("   ").await.is_err());
        assert!(f.cart.save_cart("Algo").await.is_ok());
    }

    #[tokio::test]
    async fn test_mutations_persist_the_snapshot() {
        let f = fixture();
        f.cart.toggle_item(seat_item("A1")).await;

        let raw = f.profile.get("cart-storage").await.unwrap().unwrap();
        let persisted: CartSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.items.len(), 1);
        assert_eq!(persisted.function_id, Some(FUNCTION));
        assert!(persisted.cart_expiration.is_some());
    }
}
