//! # boleteria-service
//!
//! Business logic for seat selection: session identity, the lock store,
//! the reservation cart with its countdown, and the page-lifecycle
//! coordinator.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references, with trait-object backends
//! so tests run on the in-memory table and deployments on Postgres.

pub mod cart;
pub mod context;
pub mod identity;
pub mod lifecycle;
pub mod locks;

pub use cart::{CartEvent, CartStore, RejectReason, ToggleOutcome};
pub use context::{BookingContext, BookingContextBuilder};
pub use identity::SessionIdentity;
pub use lifecycle::{CoordinatorEvent, LifecycleCoordinator};
pub use locks::LockStore;
