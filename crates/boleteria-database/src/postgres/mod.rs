//! PostgreSQL backends.

mod lock_table;
mod saved_carts;

pub use lock_table::PgLockTable;
pub use saved_carts::PgSavedCartStore;
