//! Core traits defined in `boleteria-core` and implemented by other crates.

pub mod auth;
pub mod clock;
pub mod kv;

pub use auth::{AnonymousAuthProvider, AuthProvider, StaticAuthProvider};
pub use clock::{Clock, ManualClock, SystemClock};
pub use kv::KeyValueStore;
