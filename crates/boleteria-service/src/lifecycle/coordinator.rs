//! Page-lifecycle policy.
//!
//! The browser shell translates visibility and unload happenings into
//! [`LifecycleSignal`]s; this coordinator turns them into lock traffic.
//! Hiding the page gives the seats back, returning re-claims them, and a
//! background sweep keeps held locks from lapsing under a cart whose
//! deadline outlives the lock hold.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use boleteria_core::config::lifecycle::LifecycleConfig;
use boleteria_core::events::LifecycleSignal;
use boleteria_entity::cart::CartItem;

use crate::cart::CartStore;
use crate::locks::LockStore;

const EVENT_CAPACITY: usize = 16;

/// What the coordinator wants the shell to show the visitor.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// Ask before leaving; the cart still holds seats. Advisory only.
    ConfirmExit,
    /// These seats went to someone else while the page was hidden.
    SeatsLost(Vec<CartItem>),
}

#[derive(Debug)]
struct Sweep {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Reacts to page visibility and shutdown, and owns the extend sweep.
#[derive(Debug)]
pub struct LifecycleCoordinator {
    cart: CartStore,
    locks: Arc<LockStore>,
    config: LifecycleConfig,
    events: broadcast::Sender<CoordinatorEvent>,
    sweep: Mutex<Option<Sweep>>,
}

impl LifecycleCoordinator {
    pub fn new(cart: CartStore, locks: Arc<LockStore>, config: LifecycleConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cart,
            locks,
            config,
            events,
            sweep: Mutex::new(None),
        }
    }

    /// Listen for prompts the shell should surface.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Apply one lifecycle signal.
    ///
    /// The cart body survives every signal; only locks move. A hidden page
    /// holds no locks, a visible one re-claims them, and whatever could not
    /// be re-claimed is dropped from the cart and reported.
    pub async fn handle_signal(&self, signal: LifecycleSignal) {
        debug!(signal = %signal, "Lifecycle signal");
        match signal {
            LifecycleSignal::Hidden => {
                self.release_held_locks().await;
            }
            LifecycleSignal::Visible => {
                let lost = self.cart.reacquire_all().await;
                if !lost.is_empty() {
                    warn!(lost = lost.len(), "Seats were taken while the page was hidden");
                    let _ = self.events.send(CoordinatorEvent::SeatsLost(lost));
                }
            }
            LifecycleSignal::BeforeUnload => {
                if self.config.confirm_unload && !self.cart.is_empty().await {
                    let _ = self.events.send(CoordinatorEvent::ConfirmExit);
                }
            }
            LifecycleSignal::Teardown => {
                self.release_held_locks().await;
                self.stop_extend_sweep().await;
            }
        }
    }

    /// Consume signals until the channel closes or `Teardown` arrives.
    ///
    /// Starts the extend sweep on entry and stops it on the way out, so one
    /// spawned `run` is the whole lifecycle wiring.
    pub async fn run(&self, mut signals: mpsc::Receiver<LifecycleSignal>) {
        self.start_extend_sweep().await;
        info!("Lifecycle coordinator running");
        while let Some(signal) = signals.recv().await {
            let teardown = signal == LifecycleSignal::Teardown;
            self.handle_signal(signal).await;
            if teardown {
                break;
            }
        }
        self.stop_extend_sweep().await;
        info!("Lifecycle coordinator stopped");
    }

    /// Start the periodic re-claim of this session's locks.
    ///
    /// The cart deadline is longer than the lock hold; without this sweep
    /// every lock would lapse mid-cart. No-op when disabled or already
    /// running.
    pub async fn start_extend_sweep(&self) {
        if !self.config.auto_extend_enabled {
            debug!("Extend sweep disabled by configuration");
            return;
        }
        let mut sweep = self.sweep.lock().await;
        if sweep.as_ref().is_some_and(|active| !active.task.is_finished()) {
            return;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(extend_sweep_loop(
            self.cart.clone(),
            Arc::clone(&self.locks),
            self.config.auto_extend_interval(),
            cancel.clone(),
        ));
        info!(
            interval_seconds = self.config.auto_extend_interval_seconds,
            "Extend sweep started"
        );
        *sweep = Some(Sweep { cancel, task });
    }

    /// Stop the extend sweep and wait for it to wind down.
    pub async fn stop_extend_sweep(&self) {
        let mut sweep = self.sweep.lock().await;
        if let Some(active) = sweep.take() {
            active.cancel.cancel();
            let _ = active.task.await;
            debug!("Extend sweep stopped");
        }
    }

    /// Give back every live lock for the function in play.
    ///
    /// Prefers the subscribed function; a cart built without a feed
    /// subscription still releases through its pinned function.
    async fn release_held_locks(&self) {
        let function_id = match self.locks.active_function().await {
            Some(function_id) => Some(function_id),
            None => self.cart.snapshot().await.function_id,
        };
        let Some(function_id) = function_id else {
            return;
        };
        let released = self.locks.release_all(function_id).await;
        if released > 0 {
            info!(function_id = %function_id, released, "Released locks for hidden page");
        }
    }
}

/// Every period, re-claim the session's live locks so their hold deadline
/// moves out; a re-claim also pulls `expirando` rows back to `seleccionado`.
async fn extend_sweep_loop(
    cart: CartStore,
    locks: Arc<LockStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The immediate first tick would re-claim locks acquired moments ago.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let function_id = match locks.active_function().await {
                    Some(function_id) => Some(function_id),
                    None => cart.snapshot().await.function_id,
                };
                let Some(function_id) = function_id else { continue };
                let refreshed = locks.extend_all(function_id).await;
                if refreshed > 0 {
                    debug!(function_id = %function_id, refreshed, "Periodic extend refreshed locks");
                }
            }
        }
    }
}
