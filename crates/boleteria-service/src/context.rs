//! Wiring for the whole reservation stack.

use std::sync::Arc;

use boleteria_core::config::AppConfig;
use boleteria_core::traits::auth::{AnonymousAuthProvider, AuthProvider};
use boleteria_core::traits::clock::{Clock, SystemClock};
use boleteria_core::traits::kv::KeyValueStore;
use boleteria_database::memory::{MemoryKvStore, MemoryLockTable, MemorySavedCartStore};
use boleteria_database::{LockTable, SavedCartStore};
use boleteria_realtime::LockMirror;

use crate::cart::CartStore;
use crate::identity::SessionIdentity;
use crate::lifecycle::LifecycleCoordinator;
use crate::locks::LockStore;

/// Everything one booking session needs, wired together.
///
/// Cloning is cheap; every clone shares the same stores.
#[derive(Debug, Clone)]
pub struct BookingContext {
    // ── Configuration ────────────────────────────────────────
    /// Merged application configuration
    pub config: Arc<AppConfig>,

    // ── Identity ─────────────────────────────────────────────
    /// Session identity resolver
    pub identity: Arc<SessionIdentity>,

    // ── Locks ────────────────────────────────────────────────
    /// In-process view of the active function's lock rows
    pub mirror: Arc<LockMirror>,
    /// Lock acquisition/release facade
    pub locks: Arc<LockStore>,

    // ── Cart ─────────────────────────────────────────────────
    /// The session's reservation cart
    pub cart: CartStore,

    // ── Lifecycle ────────────────────────────────────────────
    /// Visibility/unload policy and the extend sweep
    pub lifecycle: Arc<LifecycleCoordinator>,
}

impl BookingContext {
    pub fn builder() -> BookingContextBuilder {
        BookingContextBuilder::default()
    }
}

/// Assembles a [`BookingContext`] over whichever backends the caller
/// supplies.
///
/// Everything defaults to the in-memory backends, which is what tests and
/// single-node demos run on. A deployment swaps in the Postgres table and
/// a durable profile store:
///
/// ```ignore
/// let context = BookingContext::builder()
///     .config(config)
///     .table(Arc::new(PgLockTable::new(pool.clone())))
///     .saved_carts(Arc::new(PgSavedCartStore::new(pool)))
///     .profile(Arc::new(JsonFileKvStore::new(profile_path)))
///     .build();
/// ```
#[derive(Default)]
pub struct BookingContextBuilder {
    config: Option<AppConfig>,
    table: Option<Arc<dyn LockTable>>,
    auth: Option<Arc<dyn AuthProvider>>,
    profile: Option<Arc<dyn KeyValueStore>>,
    saved_carts: Option<Arc<dyn SavedCartStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl BookingContextBuilder {
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// The lock table every session shares.
    pub fn table(mut self, table: Arc<dyn LockTable>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Per-visitor storage for the anonymous id and the cart snapshot.
    pub fn profile(mut self, profile: Arc<dyn KeyValueStore>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn saved_carts(mut self, saved_carts: Arc<dyn SavedCartStore>) -> Self {
        self.saved_carts = Some(saved_carts);
        self
    }

    /// Time source; tests pin this to a manual clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> BookingContext {
        let config = Arc::new(self.config.unwrap_or_default());
        let table = self
            .table
            .unwrap_or_else(|| Arc::new(MemoryLockTable::new()));
        let auth = self
            .auth
            .unwrap_or_else(|| Arc::new(AnonymousAuthProvider));
        let profile = self
            .profile
            .unwrap_or_else(|| Arc::new(MemoryKvStore::new()));
        let saved_carts = self
            .saved_carts
            .unwrap_or_else(|| Arc::new(MemorySavedCartStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let identity = Arc::new(SessionIdentity::new(
            auth,
            Arc::clone(&profile),
            config.session.clone(),
        ));
        let mirror = Arc::new(LockMirror::new());
        let locks = Arc::new(LockStore::new(
            table,
            Arc::clone(&mirror),
            Arc::clone(&identity),
            Arc::clone(&clock),
            config.locks.clone(),
        ));
        let cart = CartStore::new(
            Arc::clone(&locks),
            Arc::clone(&identity),
            saved_carts,
            profile,
            clock,
            config.cart.clone(),
        );
        let lifecycle = Arc::new(LifecycleCoordinator::new(
            cart.clone(),
            Arc::clone(&locks),
            config.lifecycle.clone(),
        ));

        BookingContext {
            config,
            identity,
            mirror,
            locks,
            cart,
            lifecycle,
        }
    }
}
