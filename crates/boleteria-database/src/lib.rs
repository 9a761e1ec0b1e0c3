//! # boleteria-database
//!
//! The keyed-row datastore surface behind the lock and cart stores:
//! the `LockTable` and `SavedCartStore` traits with PostgreSQL and
//! in-memory implementations, the JSON-file client profile store,
//! connection pool management and migrations.

pub mod connection;
pub mod fs;
pub mod lock_table;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod saved_carts;

pub use connection::DatabasePool;
pub use lock_table::{LockTable, ReleaseOutcome, UpsertOutcome};
pub use saved_carts::SavedCartStore;
