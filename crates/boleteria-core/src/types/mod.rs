//! Core type definitions used across the boletería workspace.

pub mod id;
pub mod resource;

pub use id::*;
pub use resource::{LockKind, ResourceKey};
