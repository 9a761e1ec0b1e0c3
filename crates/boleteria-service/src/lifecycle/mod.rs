//! Page visibility and shutdown handling.

pub mod coordinator;

pub use coordinator::{CoordinatorEvent, LifecycleCoordinator};
