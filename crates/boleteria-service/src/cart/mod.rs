//! Cart state, countdown, persistence, and saved carts.

pub mod events;
pub mod store;

pub use events::{CartEvent, RejectReason, ToggleOutcome};
pub use store::CartStore;
