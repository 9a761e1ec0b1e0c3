//! In-memory backends for tests and single-node deployments.

mod kv;
mod lock_table;
mod saved_carts;

pub use kv::MemoryKvStore;
pub use lock_table::MemoryLockTable;
pub use saved_carts::MemorySavedCartStore;
