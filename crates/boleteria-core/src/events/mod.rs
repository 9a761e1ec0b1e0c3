//! Cross-cutting event types consumed by the booking components.
//!
//! Lock change events travel with the row they describe and are defined
//! next to the `SeatLock` entity; only the dependency-free lifecycle
//! signals live here.

pub mod lifecycle;

pub use lifecycle::LifecycleSignal;
