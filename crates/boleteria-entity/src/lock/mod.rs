//! Lock table entities and change events.

pub mod event;
pub mod model;
pub mod status;

pub use event::LockChange;
pub use model::{LockClaim, SeatLock};
pub use status::LockStatus;
