//! Lock acquisition, release, and freshness reads.

pub mod store;

pub use store::LockStore;
