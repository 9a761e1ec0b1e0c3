//! # boleteria-realtime
//!
//! Live view of the shared lock table for the Veneventos boletería:
//!
//! - Per-function lock mirror with two-phase reconciliation tags
//!   (pending / confirmed / conflicted)
//! - Change-feed dispatcher applying the authoritative stream, with
//!   reseed-on-lag recovery
//! - Subscription handle tying feed, seed fetch, and dispatcher lifetime
//!   together

pub mod dispatcher;
pub mod mirror;
pub mod subscription;

pub use dispatcher::FeedDispatcher;
pub use mirror::{LockMirror, MirrorEntry, SyncState};
pub use subscription::FunctionSubscription;
